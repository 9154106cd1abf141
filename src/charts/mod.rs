pub mod aggregator;

pub use aggregator::{
    ChartAggregator, ChartConfig, ChartPoint, EventPoint, EventTimeline, FocusSplit, FocusTrend,
};
