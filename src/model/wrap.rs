/// Greedily fill lines of at most `width - margin` characters with `names`,
/// separated by single spaces. A name longer than the limit gets a line of
/// its own and is not cut.
pub fn wrap_names(names: &[String], width: u16, margin: u16) -> Vec<String> {
    let limit = usize::from(width.saturating_sub(margin));
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for name in names {
        let len = name.chars().count();
        if current.is_empty() {
            current.push_str(name);
            current_len = len;
        } else if current_len + 1 + len < limit {
            current.push(' ');
            current.push_str(name);
            current_len += 1 + len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(name);
            current_len = len;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
