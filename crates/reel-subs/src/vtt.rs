// WebVTT cue engine.
//
// Parses the subset of WebVTT that subtitle overlays need: cue timings and
// text. Styling, regions and cue settings are ignored. Bad timestamps degrade
// to zero instead of failing the parse.

use tracing::trace;

const TIMING_ARROW: &str = "-->";

/// A timed subtitle span, in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct VttCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl VttCue {
    /// Inclusive on both ends.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

/// Parse a `[HH:]MM:SS.mmm` timestamp into seconds. Anything unparseable is 0.
pub fn parse_timestamp(input: &str) -> f64 {
    let parts: Vec<&str> = input.trim().split(':').collect();

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => ("0", *m, *s),
        _ => {
            trace!(timestamp = %input, "Unrecognized timestamp shape");
            return 0.0;
        }
    };

    let parsed = (
        hours.trim().parse::<u64>(),
        minutes.trim().parse::<u64>(),
        seconds.trim().parse::<f64>(),
    );
    let whole = match parsed {
        (Ok(h), Ok(m), Ok(s)) if s.is_finite() && s >= 0.0 => h
            .checked_mul(3600)
            .zip(m.checked_mul(60))
            .and_then(|(h, m)| h.checked_add(m))
            .map(|whole| (whole, s)),
        _ => None,
    };
    match whole {
        Some((whole, s)) => whole as f64 + s,
        None => {
            trace!(timestamp = %input, "Unparseable timestamp, defaulting to 0");
            0.0
        }
    }
}

fn parse_timing_line(line: &str) -> (f64, f64) {
    let (start, rest) = line.split_once(TIMING_ARROW).unwrap_or((line, ""));
    // Cue settings (`align:start line:90%`) may follow the end timestamp.
    let end = rest.split_whitespace().next().unwrap_or("");
    let start = parse_timestamp(start);
    let end = parse_timestamp(end);
    (start, end.max(start))
}

/// Parse WebVTT text into cues, in source order.
///
/// Everything before the first timing line (the `WEBVTT` header, `NOTE` and
/// `STYLE` blocks, the first cue identifier) is skipped. After that, lines
/// without a timing arrow outside a cue body (identifiers, notes) are ignored.
/// Cues with no text are dropped.
pub fn parse_vtt(text: &str) -> Vec<VttCue> {
    let lines: Vec<&str> = text.lines().collect();
    let Some(first_timing) = lines.iter().position(|line| line.contains(TIMING_ARROW)) else {
        return Vec::new();
    };

    let mut cues = Vec::new();
    let mut i = first_timing;

    while i < lines.len() {
        let line = lines[i];
        i += 1;

        if !line.contains(TIMING_ARROW) {
            continue;
        }

        let (start, end) = parse_timing_line(line);

        let mut body = Vec::new();
        while i < lines.len() && !lines[i].trim().is_empty() {
            body.push(lines[i].trim_end());
            i += 1;
        }

        let text = body.join("\n");
        if text.trim().is_empty() {
            trace!(start, end, "Dropping cue without text");
            continue;
        }

        cues.push(VttCue { start, end, text });
    }

    cues
}

/// Text of the first cue (in source order) active at `time`, or `""`.
pub fn find_active_cue(cues: &[VttCue], time: f64) -> &str {
    cues.iter()
        .find(|cue| cue.contains(time))
        .map(|cue| cue.text.as_str())
        .unwrap_or("")
}
