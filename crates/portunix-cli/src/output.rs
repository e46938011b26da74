//! Small console-output helpers shared across commands.

use colored::Colorize;

pub fn header(title: &str) {
    println!("\n{}", title.bold().underline());
    println!("{}", "-".repeat(title.len()));
}

pub fn info(message: &str) {
    println!("{} {}", "i".blue(), message);
}

pub fn success(message: &str) {
    println!("{} {}", "+".green(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", "x".red(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "!".yellow(), message);
}
