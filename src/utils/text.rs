/// Drops every non-ASCII character, keeping the rest of the message intact.
pub fn ascii_only(message: &str) -> String {
    message.chars().filter(char::is_ascii).collect()
}
