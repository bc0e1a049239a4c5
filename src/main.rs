fn main() -> anyhow::Result<()> {
    racer_lib::run()
}
