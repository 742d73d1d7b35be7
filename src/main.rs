fn main() -> anyhow::Result<()> {
    let command_line_interface = checkgen::cli::CommandLineInterface::load();
    command_line_interface.run()
}
