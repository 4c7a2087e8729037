//! CSV deck format.
//!
//! A deck file has a header row, question and answer in the first two
//! columns, and optional `Accuracy` and `LastAsked` columns found by name.

use csv::{ReaderBuilder, Trim, WriterBuilder};

use crate::models::Flashcard;

const ACCURACY_COLUMN: &str = "Accuracy";
const LAST_ASKED_COLUMN: &str = "LastAsked";
const HEADER: [&str; 4] = ["Question", "Answer", ACCURACY_COLUMN, LAST_ASKED_COLUMN];

/// Parse deck file contents into cards.
///
/// Ids count data records in file order. Rows with an empty question or
/// answer are skipped but still consume an id; blank lines are not records
/// and consume nothing.
pub fn parse_deck(content: &str) -> Result<Vec<Flashcard>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let accuracy_idx = headers.iter().position(|h| h == ACCURACY_COLUMN);
    let last_asked_idx = headers.iter().position(|h| h == LAST_ASKED_COLUMN);

    let mut cards = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;

        let question = record.get(0).unwrap_or_default();
        let answer = record.get(1).unwrap_or_default();
        if question.is_empty() || answer.is_empty() {
            continue;
        }

        let accuracy = accuracy_idx
            .and_then(|i| record.get(i))
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|a| a.is_finite())
            .map(|a| a.clamp(0.0, 1.0))
            .unwrap_or(0.0);

        let last_asked = last_asked_idx
            .and_then(|i| record.get(i))
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|&t| t > 0);

        cards.push(Flashcard {
            accuracy,
            last_asked,
            ..Flashcard::new(format!("card-{}", index), question, answer)
        });
    }

    Ok(cards)
}

/// Render cards back into deck file contents, progress columns included.
pub fn render_deck(cards: &[Flashcard]) -> Result<String, csv::Error> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for card in cards {
        let accuracy = format!("{:.4}", card.accuracy);
        let last_asked = card.last_asked.map(|t| t.to_string()).unwrap_or_default();
        writer.write_record([
            card.question.as_str(),
            card.answer.as_str(),
            accuracy.as_str(),
            last_asked.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_question_answer_file() {
        let cards = parse_deck("Question,Answer\nhola,hello\nadiós,goodbye\n").unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].id, "card-0");
        assert_eq!(cards[0].question, "hola");
        assert_eq!(cards[1].answer, "goodbye");
        assert!(cards.iter().all(|c| c.accuracy == 0.0 && c.last_asked.is_none()));
    }

    #[test]
    fn test_progress_columns_by_name() {
        let content = "Question,Answer,LastAsked,Accuracy\n\
                       2+2,4,1700000000000,0.75\n\
                       3+3,6,,\n";
        let cards = parse_deck(content).unwrap();
        assert_eq!(cards[0].accuracy, 0.75);
        assert_eq!(cards[0].last_asked, Some(1_700_000_000_000));
        assert_eq!(cards[1].accuracy, 0.0);
        assert_eq!(cards[1].last_asked, None);
    }

    #[test]
    fn test_quoted_fields() {
        let content = "Question,Answer\n\"Capital of France, the country\",\"Paris, \"\"city of light\"\"\"\n";
        let cards = parse_deck(content).unwrap();
        assert_eq!(cards[0].question, "Capital of France, the country");
        assert_eq!(cards[0].answer, "Paris, \"city of light\"");
    }

    #[test]
    fn test_skipped_rows_keep_position_ids() {
        let content = "Question,Answer\nfirst,1\n,missing question\nthird,3\nonly question\n";
        let cards = parse_deck(content).unwrap();
        let ids: Vec<&str> = cards.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["card-0", "card-2"]);
    }

    #[test]
    fn test_bad_progress_values_default() {
        let content = "Question,Answer,Accuracy,LastAsked\nq,a,lots,yesterday\nq2,a2,1.7,0\n";
        let cards = parse_deck(content).unwrap();
        assert_eq!(cards[0].accuracy, 0.0);
        assert_eq!(cards[0].last_asked, None);
        assert_eq!(cards[1].accuracy, 1.0);
        assert_eq!(cards[1].last_asked, None);
    }

    #[test]
    fn test_negative_last_asked_is_never_asked() {
        let content = "Question,Answer,Accuracy,LastAsked\n\
                       q,a,0.3,-9223372036854775808\n\
                       q2,a2,0.3,-5\n\
                       q3,a3,0.3,99999999999999999999\n";
        let cards = parse_deck(content).unwrap();
        assert!(cards.iter().all(|c| c.last_asked.is_none()));
    }

    #[test]
    fn test_blank_lines_consume_no_id() {
        let cards = parse_deck("Question,Answer\nfirst,1\n\nsecond,2\n").unwrap();
        let ids: Vec<&str> = cards.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["card-0", "card-1"]);
    }

    #[test]
    fn test_header_only_is_empty() {
        assert!(parse_deck("Question,Answer\n").unwrap().is_empty());
        assert!(parse_deck("").unwrap().is_empty());
    }

    #[test]
    fn test_render_writes_progress() {
        let mut studied = Flashcard::new("card-0", "a, b", "c");
        studied.accuracy = 0.8;
        studied.last_asked = Some(1_700_000_000_000);
        let fresh = Flashcard::new("card-1", "d", "e");

        let out = render_deck(&[studied, fresh]).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Question,Answer,Accuracy,LastAsked");
        assert_eq!(lines[1], "\"a, b\",c,0.8000,1700000000000");
        assert_eq!(lines[2], "d,e,0.0000,");

        let reparsed = parse_deck(&out).unwrap();
        assert_eq!(reparsed[0].accuracy, 0.8);
        assert_eq!(reparsed[1].last_asked, None);
    }
}
