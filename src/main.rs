use rabies_model::runner::run_with_args;

fn main() {
    if let Err(error) = run_with_args(|_, _| Ok(())) {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
