//! Caption segmentation and SRT serialization.

use std::num::NonZeroUsize;
use std::path::Path;

use reel_models::{parse_srt_timestamp, CaptionCue, WordTimestamp};

use crate::error::{MediaError, MediaResult};

/// Default number of words shown per caption.
pub const DEFAULT_WORDS_PER_CUE: NonZeroUsize = match NonZeroUsize::new(3) {
    Some(n) => n,
    None => unreachable!(),
};

/// Group words into consecutive cues of at most `max_words_per_cue` words.
///
/// Each cue spans from its first word's start to its last word's end.
/// Words are trimmed before joining with a single space.
pub fn segment(words: &[WordTimestamp], max_words_per_cue: NonZeroUsize) -> Vec<CaptionCue> {
    words
        .chunks(max_words_per_cue.get())
        .enumerate()
        .filter_map(|(i, group)| {
            let first = group.first()?;
            let last = group.last()?;
            let text = group
                .iter()
                .map(|w| w.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            Some(CaptionCue {
                index: i + 1,
                start: first.start,
                end: last.end,
                text,
            })
        })
        .collect()
}

/// Serialize cues as an SRT document.
pub fn to_srt(cues: &[CaptionCue]) -> String {
    cues.iter().map(CaptionCue::to_srt_block).collect()
}

/// Write cues to an SRT file.
pub async fn write_srt(cues: &[CaptionCue], path: &Path) -> MediaResult<()> {
    tokio::fs::write(path, to_srt(cues)).await?;
    Ok(())
}

/// Parse an SRT document.
///
/// Multi-line cue text is joined with `\n`. Blocks are separated by blank lines.
pub fn parse_srt(content: &str) -> MediaResult<Vec<CaptionCue>> {
    let normalized = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut cues = Vec::new();

    for block in normalized.split("\n\n") {
        let mut lines = block.lines().filter(|l| !l.trim().is_empty());
        let Some(index_line) = lines.next() else {
            continue;
        };

        let index: usize = index_line.trim().parse().map_err(|_| {
            MediaError::InvalidInput(format!("invalid cue index: '{}'", index_line.trim()))
        })?;

        let timing = lines
            .next()
            .ok_or_else(|| MediaError::InvalidInput(format!("cue {} has no timing line", index)))?;
        let (start, end) = timing.split_once("-->").ok_or_else(|| {
            MediaError::InvalidInput(format!("cue {} has malformed timing: '{}'", index, timing))
        })?;

        let start = parse_srt_timestamp(start)
            .map_err(|e| MediaError::InvalidInput(format!("cue {}: {}", index, e)))?;
        let end = parse_srt_timestamp(end)
            .map_err(|e| MediaError::InvalidInput(format!("cue {}: {}", index, e)))?;

        cues.push(CaptionCue {
            index,
            start,
            end,
            text: lines.collect::<Vec<_>>().join("\n"),
        });
    }

    Ok(cues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::timestamp::truncate_millis;

    fn words(n: usize, step: f64) -> Vec<WordTimestamp> {
        (0..n)
            .map(|i| WordTimestamp::new(format!(" w{}", i), i as f64 * step, (i + 1) as f64 * step))
            .collect()
    }

    fn k(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_segment_counts_and_indices() {
        for (n, per) in [(0, 3), (1, 3), (3, 3), (7, 3), (9, 3), (10, 4), (5, 1)] {
            let cues = segment(&words(n, 0.5), k(per));
            assert_eq!(cues.len(), n.div_ceil(per), "n={} k={}", n, per);
            for (i, cue) in cues.iter().enumerate() {
                assert_eq!(cue.index, i + 1);
                assert!(cue.word_count() <= per);
                assert!(cue.start <= cue.end);
            }
            for pair in cues.windows(2) {
                assert!(pair[0].start <= pair[1].start);
                assert!(pair[0].end <= pair[1].start);
            }
        }
    }

    #[test]
    fn test_segment_text_and_bounds() {
        let cues = segment(&words(9, 0.5), DEFAULT_WORDS_PER_CUE);
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].text, "w0 w1 w2");
        assert_eq!(cues[0].start, 0.0);
        assert_eq!(cues[0].end, 1.5);
        assert_eq!(cues[2].start, 3.0);
        assert_eq!(cues[2].end, 4.5);
    }

    #[test]
    fn test_segment_is_deterministic() {
        let input = words(11, 0.37);
        assert_eq!(segment(&input, k(4)), segment(&input, k(4)));
    }

    #[test]
    fn test_srt_layout() {
        let cues = segment(&words(4, 0.5), k(3));
        assert_eq!(
            to_srt(&cues),
            "1\n00:00:00,000 --> 00:00:01,500\nw0 w1 w2\n\n2\n00:00:01,500 --> 00:00:02,000\nw3\n\n"
        );
        assert_eq!(to_srt(&[]), "");
    }

    #[test]
    fn test_srt_round_trip_truncates_to_millis() {
        let input = vec![
            WordTimestamp::new("alpha", 0.0004, 1.2349),
            WordTimestamp::new("beta", 1.2349, 2.71828),
            WordTimestamp::new("gamma", 61.0015, 3599.9999),
        ];
        let cues = segment(&input, k(1));
        let parsed = parse_srt(&to_srt(&cues)).unwrap();

        assert_eq!(parsed.len(), cues.len());
        for (original, back) in cues.iter().zip(&parsed) {
            assert_eq!(back.index, original.index);
            assert_eq!(back.text, original.text);
            assert_eq!(truncate_millis(back.start), truncate_millis(original.start));
            assert_eq!(truncate_millis(back.end), truncate_millis(original.end));
        }
    }

    #[test]
    fn test_parse_srt_tolerates_crlf_and_multiline() {
        let doc = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,500\r\nfirst line\r\nsecond line\r\n\r\n";
        let cues = parse_srt(doc).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "first line\nsecond line");
        assert_eq!(cues[0].end, 2.5);
    }

    #[test]
    fn test_parse_srt_rejects_garbage() {
        assert!(parse_srt("one\n00:00:01,000 --> 00:00:02,000\nx\n").is_err());
        assert!(parse_srt("1\n00:00:01,000 00:00:02,000\nx\n").is_err());
    }

    #[tokio::test]
    async fn test_write_srt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.srt");
        let cues = segment(&words(2, 1.0), k(3));
        write_srt(&cues, &path).await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(parse_srt(&written).unwrap(), cues);
    }
}
