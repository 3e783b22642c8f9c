// the collection of utility functions mainly for bracket scanning and number printing

/// removes every whitespace character, the grammar has no whitespace-sensitive tokens
pub fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

/// true if the parenthesis depth never goes negative and ends at zero
pub fn brackets_balanced(s: &str) -> bool {
    let mut depth: i64 = 0;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

// byte position of the bracket closing the one opened at `bracket_start`
pub fn find_pair_to_this_bracket(input: &str, bracket_start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in input.char_indices().skip_while(|(i, _)| *i < bracket_start) {
        if c == '(' {
            depth += 1;
        } else if c == ')' {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// true for "(...)" where the first bracket is closed by the very last character
pub fn encloses_whole(s: &str) -> bool {
    s.starts_with('(')
        && s.ends_with(')')
        && find_pair_to_this_bracket(s, 0) == Some(s.len() - 1)
}

/// Rightmost `*`, `/` or `.` at parenthesis depth zero, returned as (byte position, operator).
/// A `.` followed by a digit is a decimal point, not a product. Cuts that leave an empty
/// side are skipped.
pub fn find_rightmost_operator_outside_brackets(input: &str) -> Option<(usize, char)> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut depth: i64 = 0;
    for (k, &(i, c)) in chars.iter().enumerate().rev() {
        match c {
            ')' => depth += 1,
            '(' => depth -= 1,
            '*' | '/' | '.' if depth == 0 => {
                let next = chars.get(k + 1).map(|&(_, n)| n);
                if c == '.' && next.is_none_or(|n| n.is_ascii_digit()) {
                    continue;
                }
                if i == 0 || next.is_none() {
                    continue;
                }
                return Some((i, c));
            }
            _ => {}
        }
    }
    None
}

/// Prints a number the way a person writes it: integral values without a fractional
/// part, floating point noise below 1e-10 rounded away, never "-0".
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = if value.abs() < 1e15 {
        (value * 1e10).round() / 1e10
    } else {
        value
    };
    if rounded == 0.0 {
        return "0".to_string();
    }
    if rounded.fract() == 0.0 && rounded.abs() < 9.0e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

/// rounds to `digits` significant digits
pub fn round_significant(value: f64, digits: i32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(digits - 1 - magnitude);
    (value * factor).round() / factor
}

/// true if `value` is within `tolerance` of an integer
pub fn is_integral(value: f64, tolerance: f64) -> bool {
    (value - value.round()).abs() < tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brackets_balanced() {
        assert!(brackets_balanced("sin(x^2)*(x+1)"));
        assert!(brackets_balanced("x"));
        assert!(!brackets_balanced("sin((x)"));
        assert!(!brackets_balanced("x)("));
    }

    #[test]
    fn test_find_pair_to_this_bracket() {
        assert_eq!(find_pair_to_this_bracket("(x+(y))*z", 0), Some(6));
        assert_eq!(find_pair_to_this_bracket("(x+(y))*z", 3), Some(5));
        assert_eq!(find_pair_to_this_bracket("(x+(y)", 0), None);
        assert!(encloses_whole("(x+1)"));
        assert!(!encloses_whole("(x+1)*(x-1)"));
        assert!(!encloses_whole("x+1"));
    }

    #[test]
    fn test_find_rightmost_operator() {
        assert_eq!(find_rightmost_operator_outside_brackets("x*sin(x*y)"), Some((1, '*')));
        assert_eq!(find_rightmost_operator_outside_brackets("a/b*c"), Some((3, '*')));
        assert_eq!(find_rightmost_operator_outside_brackets("x.exp(x)"), Some((1, '.')));
        assert_eq!(find_rightmost_operator_outside_brackets("2.5x^2"), None);
        assert_eq!(find_rightmost_operator_outside_brackets("(x*y)"), None);
        assert_eq!(find_rightmost_operator_outside_brackets("x*"), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333");
    }

    #[test]
    fn test_round_significant() {
        assert_eq!(round_significant(1.0 / 3.0, 4), 0.3333);
        assert_eq!(round_significant(-123.456, 4), -123.5);
        assert_eq!(round_significant(0.0, 4), 0.0);
        assert!(is_integral(3.0000000000001, 1e-9));
        assert!(!is_integral(2.5, 1e-9));
    }
}
