//! Terminal rendering of error cases.

use std::fmt::Write as _;

use crate::eval::ErrorCase;

const HIGHLIGHT: &str = "\x1b[1;32m";
const RESET: &str = "\x1b[0m";

/// Format like C's `%.<sig>g`: fixed notation for moderate exponents,
/// scientific otherwise, trailing zeros removed.
pub fn format_g(x: f64, sig: usize) -> String {
    if !x.is_finite() {
        return x.to_string();
    }
    if x == 0.0 {
        return "0".to_string();
    }
    let sig = sig.max(1);
    let sci = format!("{:.*e}", sig - 1, x);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return sci,
    };

    if exp < -4 || exp >= sig as i32 {
        let mantissa = trim_fraction(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        let decimals = (sig as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, x)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Context with the first contained answer highlighted; `None` when no
/// answer occurs in it.
fn highlight_answer(context: &str, answers: &[String], color: bool) -> Option<String> {
    let answer = answers.iter().find(|a| !a.is_empty() && context.contains(a.as_str()))?;
    let start = context.find(answer.as_str())?;
    let end = start + answer.len();
    let (open, close) = if color { (HIGHLIGHT, RESET) } else { ("[", "]") };
    Some(format!("{}{}{}{}{}", &context[..start], open, &context[start..end], close, &context[end..]))
}

/// Full printable view of a case: question, answers, the correct title and
/// context when known, and the ranked candidate table.
pub fn render_case(case: &ErrorCase, color: bool) -> String {
    let mut out = String::new();
    let answers = serde_json::to_string(&case.answer).unwrap_or_default();
    let _ = write!(out, "Question:\n{}\n\nAnswer:\n{}\n", case.question, answers);

    if let Some(sq) = case.reformulated() {
        let _ = write!(out, "\nReformulated:\n{}\n", sq);
    }

    if let Some(title) = case.title.as_deref().filter(|t| !t.is_empty()) {
        let _ = write!(out, "\nCorrect Title:\n{}\n\nContext:\n", title);
        let context = case.context.as_deref().unwrap_or("");
        match highlight_answer(context, &case.answer, color) {
            Some(marked) => {
                let _ = writeln!(out, "{}", marked);
            }
            None => {
                log::warn!("none of {} occurs in the context of '{}'", answers, title);
                let _ = writeln!(out, "{}", context);
            }
        }
    }

    let _ = write!(out, "\nTop {} docs:\n", case.candidates.len());
    let _ = writeln!(out, "{:-<64}", "");
    let _ = writeln!(out, "{:<6} {:<42} {:>14}", "Rank", "Doc Id", "Doc Score");
    let _ = writeln!(out, "{:-<64}", "");
    for (rank, (doc_id, score)) in case.candidates.iter().enumerate() {
        let _ = writeln!(out, "{:<6} {:<42} {:>14}", rank + 1, doc_id, format_g(*score, 5));
    }
    let _ = writeln!(out, "{:-<64}", "");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_g() {
        assert_eq!(format_g(12.5, 5), "12.5");
        assert_eq!(format_g(123.456789, 5), "123.46");
        assert_eq!(format_g(123456.0, 5), "1.2346e+05");
        assert_eq!(format_g(0.0001234, 5), "0.0001234");
        assert_eq!(format_g(0.00001234, 5), "1.234e-05");
        assert_eq!(format_g(99999.9, 5), "1e+05");
        assert_eq!(format_g(-3.0, 5), "-3");
        assert_eq!(format_g(0.0, 5), "0");
    }

    fn case() -> ErrorCase {
        ErrorCase::new(
            "Which city hosts the Louvre?".to_string(),
            vec!["Paris".to_string()],
            vec![("Lyon".to_string(), 321.5), ("Nice".to_string(), 12.0)],
        )
    }

    #[test]
    fn test_render_case_table() {
        let text = render_case(&case(), false);
        assert!(text.contains("Question:\nWhich city hosts the Louvre?\n"));
        assert!(text.contains("Answer:\n[\"Paris\"]\n"));
        assert!(text.contains("Top 2 docs:"));
        let rows: Vec<&str> = text.lines().filter(|l| l.starts_with('1') || l.starts_with('2')).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("Lyon") && rows[0].ends_with("321.5"));
        assert!(rows[1].contains("Nice") && rows[1].ends_with("12"));
        assert!(!text.contains("Correct Title"));
    }

    #[test]
    fn test_render_case_highlights_context() {
        let mut c = case();
        c.title = Some("Louvre".to_string());
        c.context = Some("The Louvre is in Paris, France.".to_string());

        let plain = render_case(&c, false);
        assert!(plain.contains("Correct Title:\nLouvre\n"));
        assert!(plain.contains("The Louvre is in [Paris], France."));

        let colored = render_case(&c, true);
        assert!(colored.contains("\x1b[1;32mParis\x1b[0m"));
    }

    #[test]
    fn test_render_case_context_without_answer() {
        let mut c = case();
        c.title = Some("Louvre".to_string());
        c.context = Some("A museum.".to_string());
        assert!(render_case(&c, false).contains("A museum.\n"));
    }
}
