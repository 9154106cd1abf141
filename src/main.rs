fn main() {
    focusguard_lib::run()
}
