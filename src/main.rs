fn main() {
    safenix::run_cli();
}
