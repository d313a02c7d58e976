use colored::Colorize;

fn main() {
    if let Err(e) = aoa_vm_scheduler::cli::run() {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
