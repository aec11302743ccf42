//! Console output helpers. Everything the user sees goes through here.

use colored::*;

pub fn header(text: &str) {
    println!("\n{}", text.blue().bold());
}

pub fn step(text: &str) {
    println!("   👉 {}", text);
}

pub fn success(text: &str) {
    println!("   {}", format!("✅ {}", text).green());
}

pub fn info(text: &str) {
    println!("   ℹ️  {}", text);
}

pub fn warn(text: &str) {
    println!("   {}", format!("⚠️  {}", text).yellow());
}

pub fn error(text: &str) {
    eprintln!("   {}", format!("❌ {}", text).red());
}

/// `• a.js` per entry, or a dimmed placeholder.
pub fn list(title: &str, items: &[String]) {
    println!("\n   {}", title.bold());
    if items.is_empty() {
        println!("      {}", "(none)".dimmed());
    }
    for item in items {
        println!("      • {}", item);
    }
}

pub fn key_value(key: &str, value: &str) {
    println!("   {} {}", format!("{:<24}", key).bold(), value);
}

pub fn banner() {
    println!("{}", "🌶️  Spicetify Wizard".green().bold());
    println!("{}", "   Spotify + Spicetify setup and configuration".dimmed());
}
