fn main() -> Result<(), Box<dyn std::error::Error>> {
    musica::runtime::run()
}
