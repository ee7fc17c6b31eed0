use std::io::{self, Write};

/// Helper function to read a line from stdin
pub fn read_line() -> io::Result<String> {
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Helper function to prompt for input with confirmation. Only `y` or
/// `yes` confirms; an empty answer declines.
pub fn prompt_with_confirmation(prompt: &str, confirmation: &str) -> io::Result<bool> {
    println!("{}", prompt);
    print!("{} (y/N): ", confirmation);
    io::stdout().flush()?;

    let response = read_line()?.to_lowercase();
    Ok(is_confirmation(&response))
}

fn is_confirmation(response: &str) -> bool {
    response == "y" || response == "yes"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_answers() {
        assert!(!is_confirmation(""));
        assert!(is_confirmation("y"));
        assert!(is_confirmation("yes"));
        assert!(!is_confirmation("n"));
        assert!(!is_confirmation("nope"));
    }
}
