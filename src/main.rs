fn main() -> std::process::ExitCode {
    glyphscribe_lib::run()
}
