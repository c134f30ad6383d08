use std::process::ExitCode;

fn main() -> ExitCode {
    match grain_size_tools::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
