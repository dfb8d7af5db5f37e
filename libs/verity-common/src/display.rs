// Abbreviation of long program output for feedback and log previews

pub const DEFAULT_LIMIT_CHARACTERS: usize = 512;
pub const DEFAULT_MAX_LINES: usize = 20;
pub const DEFAULT_ELLIPSIS: &str = "...";

/// Shorten `output` to at most `limit_characters` characters and `max_lines`
/// lines, keeping lines from both the head and the tail around an ellipsis.
pub fn limit_output(output: &str, limit_characters: usize, max_lines: usize, ellipsis: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    if output.chars().count() <= limit_characters && lines.len() <= max_lines {
        return output.to_string();
    }

    let mut budget = limit_characters as i64 - ellipsis.chars().count() as i64;
    let mut head: Vec<String> = Vec::new();
    let mut tail: Vec<String> = Vec::new();

    let rounds = max_lines.saturating_sub(1).min(lines.len()).div_ceil(2);
    for front in 0..rounds {
        let back = lines.len() - front - 1;
        if front == back {
            head.push(take_head(lines[front], budget - 1));
            break;
        }

        let next = lines[front];
        let prev = lines[back];
        let next_len = next.chars().count() as i64;
        let prev_len = prev.chars().count() as i64;
        let both = next_len + prev_len + 2;

        if both < budget {
            head.push(next.to_string());
            tail.push(prev.to_string());
            budget -= both;
            continue;
        }

        if next_len + 2 < budget {
            head.push(next.to_string());
            budget -= next_len + 2;
            tail.push(take_tail(prev, budget));
        } else if prev_len + 2 < budget {
            tail.push(prev.to_string());
            budget -= prev_len + 2;
            head.push(take_head(next, budget));
        } else {
            let half = budget as f64 / 2.0;
            head.push(take_head(next, (half - 1.0).ceil() as i64));
            tail.push(take_tail(prev, (half - 1.0).floor() as i64));
        }
        break;
    }

    head.push(ellipsis.to_string());
    head.extend(tail.into_iter().rev());
    head.join("\n")
}

/// [`limit_output`] with the default limits.
pub fn abbreviate(output: &str) -> String {
    limit_output(output, DEFAULT_LIMIT_CHARACTERS, DEFAULT_MAX_LINES, DEFAULT_ELLIPSIS)
}

fn take_head(line: &str, count: i64) -> String {
    line.chars().take(count.max(0) as usize).collect()
}

fn take_tail(line: &str, count: i64) -> String {
    let total = line.chars().count();
    let skip = total.saturating_sub(count.max(0) as usize);
    line.chars().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_output_is_untouched() {
        assert_eq!(abbreviate("hello\nworld"), "hello\nworld");
        assert_eq!(abbreviate(""), "");
    }

    #[test]
    fn test_too_many_lines_keeps_head_and_tail() {
        let output: Vec<String> = (0..30).map(|i| format!("line {i}")).collect();
        let limited = abbreviate(&output.join("\n"));

        let lines: Vec<&str> = limited.lines().collect();
        assert_eq!(lines.len(), 21);
        assert_eq!(lines[0], "line 0");
        assert_eq!(lines[9], "line 9");
        assert_eq!(lines[10], "...");
        assert_eq!(lines[11], "line 20");
        assert_eq!(lines[20], "line 29");
    }

    #[test]
    fn test_long_single_line_is_cut() {
        let limited = abbreviate(&"a".repeat(1000));
        assert!(limited.ends_with("\n..."));
        assert_eq!(limited.chars().count(), 512);
    }

    #[test]
    fn test_long_lines_share_the_budget() {
        let output = format!("{}\n{}", "x".repeat(400), "y".repeat(400));
        let limited = limit_output(&output, 100, 20, "...");
        let lines: Vec<&str> = limited.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].chars().all(|c| c == 'x'));
        assert_eq!(lines[1], "...");
        assert!(lines[2].chars().all(|c| c == 'y'));
        assert!(limited.chars().count() <= 100);
    }
}
