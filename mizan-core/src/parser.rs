//! Free-text task capture for mixed English/Arabic input.
//!
//! Deterministic, no LLM. The vocabularies below are plain data; the parser
//! runs them in a fixed order:
//! 1) category: first rule with a matching token, Study -> Habit -> Prayer -> Work;
//! 2) deadline: "tomorrow" words push one day forward;
//! 3) duration: hour patterns beat minute patterns, default 30;
//! 4) time: period words, overridden by an explicit clock time;
//! 5) title: the text with every matched temporal phrase removed.
//!
//! Parsing never fails. A title that strips down to nothing falls back to
//! the raw input.

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use regex::Regex;

use crate::task::{Category, Priority, TaskDraft};
use crate::time::local_day;

pub const DEFAULT_MINUTES: u32 = 30;

pub struct KeywordRule {
    pub category: Category,
    pub words: &'static [&'static str],
}

/// Ordered: the first rule with a hit wins.
pub const CATEGORY_RULES: &[KeywordRule] = &[
    KeywordRule {
        category: Category::Study,
        words: &[
            "study", "studies", "studying", "exam", "homework", "lecture", "revise", "revision", "course",
            "assignment", "quiz", "مذاكرة", "مذاكره", "ذاكر", "دراسة", "دراسه", "امتحان", "اختبار", "واجب",
            "محاضرة", "محاضره",
        ],
    },
    KeywordRule {
        category: Category::Habit,
        words: &[
            "gym", "workout", "exercise", "run", "running", "walk", "walking", "water", "meditate", "stretch",
            "yoga", "رياضة", "رياضه", "تمرين", "مشي", "جيم", "ماء", "مويه", "تأمل",
        ],
    },
    KeywordRule {
        category: Category::Prayer,
        words: &[
            "pray", "prayer", "quran", "fajr", "dhuhr", "zuhr", "asr", "maghrib", "isha", "dhikr", "adhkar",
            "صلاة", "صلاه", "قرآن", "قران", "فجر", "مغرب", "اذكار", "أذكار", "تراويح",
        ],
    },
    KeywordRule {
        category: Category::Work,
        words: &[
            "work", "meeting", "email", "report", "project", "client", "call", "office", "شغل", "اجتماع", "عمل",
            "مشروع", "تقرير", "ايميل", "عميل", "دوام",
        ],
    },
];

pub const TOMORROW_WORDS: &[&str] = &["tomorrow", "tmrw", "بكرة", "بكره", "بكرا", "غداً", "غدا"];

/// Stripped from the title but do not move the deadline.
pub const TODAY_WORDS: &[&str] = &["today", "tonight", "اليوم", "الليلة"];

/// Period word -> fixed local clock time. `pm` marks periods from noon on,
/// so a bare clock hour next to them reads as afternoon.
pub struct PeriodWord {
    pub word: &'static str,
    pub hour: u32,
    pub minute: u32,
    pub pm: bool,
}

const fn period(word: &'static str, hour: u32, minute: u32, pm: bool) -> PeriodWord {
    PeriodWord { word, hour, minute, pm }
}

pub const PERIOD_WORDS: &[PeriodWord] = &[
    period("الصباح", 9, 0, false),
    period("الصبح", 9, 0, false),
    period("صباحاً", 9, 0, false),
    period("صباحا", 9, 0, false),
    period("الظهر", 12, 0, true),
    period("ظهراً", 12, 0, true),
    period("ظهرا", 12, 0, true),
    period("العصر", 16, 0, true),
    period("عصراً", 16, 0, true),
    period("عصرا", 16, 0, true),
    period("المساء", 20, 0, true),
    period("مساءً", 20, 0, true),
    period("مساء", 20, 0, true),
    period("المسا", 20, 0, true),
    period("بالليل", 20, 0, true),
];

const ENGLISH_SUFFIXES: &[&str] = &["s", "es", "ed", "ing", "er", "ers"];
const ARABIC_PREFIXES: &[&str] = &["وال", "بال", "فال", "كال", "لل", "ال", "و", "ب", "ل", "ف"];

static HOURS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bfor\s+|لمدة\s*)?([0-9]+(?:\.[0-9]+)?)\s*(?:hours?\b|hrs?\b|h\b|ساعات|ساعة|ساعه)")
        .expect("hours pattern")
});

static TWO_HOURS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:لمدة\s*)?ساعتين").expect("two-hours pattern"));

static MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bfor\s+|لمدة\s*)?([0-9]+)\s*(?:minutes?\b|mins?\b|m\b|دقائق|دقيقة|دقيقه)")
        .expect("minutes pattern")
});

static AT_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bat\s+([0-9]{1,2})(?::([0-9]{2}))?\s*(am|pm)?\b").expect("clock pattern")
});

static ARABIC_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:ال)?ساع[ةه]\s*([0-9]{1,2})(?::([0-9]{2}))?").expect("arabic clock pattern")
});

static TOMORROW_RE: LazyLock<Regex> = LazyLock::new(|| word_regex(TOMORROW_WORDS));
static TODAY_RE: LazyLock<Regex> = LazyLock::new(|| word_regex(TODAY_WORDS));

static PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    let words: Vec<&str> = PERIOD_WORDS.iter().map(|p| p.word).collect();
    word_regex(&words)
});

/// Whole-token alternation over `words`, longest first. A word may carry
/// one attached Arabic prefix (و, ب, ال, ...). Group 1 is the word itself.
fn word_regex(words: &[&str]) -> Regex {
    let mut sorted: Vec<&str> = words.to_vec();
    sorted.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    let alts: Vec<String> = sorted.iter().map(|w| regex::escape(w)).collect();
    let prefixes: Vec<String> = ARABIC_PREFIXES.iter().map(|p| regex::escape(p)).collect();
    Regex::new(&format!(
        r"(?i)(?:^|[^\p{{L}}\p{{N}}])(?:{})?({})(?:$|[^\p{{L}}\p{{N}}])",
        prefixes.join("|"),
        alts.join("|")
    ))
    .expect("keyword pattern")
}

/// Spans of every whole-token hit of `re`, without the surrounding separators.
fn word_spans(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.range())
        .collect()
}

/// Map Arabic-Indic and Persian digits to ASCII.
fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
            '۰'..='۹' => char::from(b'0' + (c as u32 - '۰' as u32) as u8),
            _ => c,
        })
        .collect()
}

pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn token_matches(token: &str, word: &str) -> bool {
    if word.is_ascii() {
        return token == word
            || token
                .strip_prefix(word)
                .is_some_and(|rest| ENGLISH_SUFFIXES.contains(&rest));
    }
    if token.starts_with(word) {
        return true;
    }
    ARABIC_PREFIXES
        .iter()
        .filter_map(|p| token.strip_prefix(p))
        .any(|stem| stem.starts_with(word))
}

/// First category whose vocabulary hits a token; Other when none do.
pub fn classify(text: &str) -> Category {
    let tokens = tokenize(&normalize_digits(text));
    CATEGORY_RULES
        .iter()
        .find(|rule| {
            rule.words
                .iter()
                .any(|w| tokens.iter().any(|t| token_matches(t, w)))
        })
        .map(|rule| rule.category)
        .unwrap_or(Category::Other)
}

fn parse_duration(text: &str, spans: &mut Vec<Range<usize>>) -> u32 {
    let mut minutes = None;

    if let Some(m) = TWO_HOURS_RE.find(text) {
        spans.push(m.range());
        minutes = Some(120);
    }

    if let Some(c) = HOURS_RE.captures(text) {
        spans.push(c.get(0).map_or(0..0, |m| m.range()));
        if minutes.is_none() {
            minutes = c
                .get(1)
                .and_then(|h| h.as_str().parse::<f64>().ok())
                .map(|h| (h * 60.0).round() as u32);
        }
    }

    if let Some(c) = MINUTES_RE.captures(text) {
        spans.push(c.get(0).map_or(0..0, |m| m.range()));
        if minutes.is_none() {
            minutes = c.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        }
    }

    minutes.filter(|m| *m > 0).unwrap_or(DEFAULT_MINUTES)
}

fn clock(hour: u32, minute: u32, meridiem: Option<&str>) -> Option<NaiveTime> {
    let hour = match meridiem.map(str::to_lowercase).as_deref() {
        Some("pm") if hour < 12 => hour + 12,
        Some("am") if hour == 12 => 0,
        _ => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn parse_time(text: &str, spans: &mut Vec<Range<usize>>) -> Option<NaiveTime> {
    let mut time = None;
    let mut after_noon = false;

    if let Some(m) = PERIOD_RE.captures(text).and_then(|c| c.get(1)) {
        spans.push(m.range());
        if let Some(p) = PERIOD_WORDS.iter().find(|p| p.word == m.as_str()) {
            time = NaiveTime::from_hms_opt(p.hour, p.minute, 0);
            after_noon = p.pm;
        }
    }

    let explicit = AT_TIME_RE
        .captures(text)
        .or_else(|| ARABIC_TIME_RE.captures(text));
    if let Some(c) = explicit {
        spans.push(c.get(0).map_or(0..0, |m| m.range()));
        let hour = c.get(1).and_then(|h| h.as_str().parse::<u32>().ok());
        let minute = c
            .get(2)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0);
        // "at 8" next to an evening word means 20:00; noon words count too.
        let meridiem = c
            .get(3)
            .map(|m| m.as_str())
            .or(if after_noon { Some("pm") } else { None });
        if let Some(t) = hour.and_then(|h| clock(h, minute, meridiem)) {
            time = Some(t);
        }
    }

    time
}

fn strip_spans(text: &str, mut spans: Vec<Range<usize>>) -> String {
    spans.retain(|r| !r.is_empty());
    spans.sort_by_key(|r| r.start);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for r in spans {
        if r.start > cursor {
            out.push_str(&text[cursor..r.start]);
        }
        cursor = cursor.max(r.end);
    }
    if cursor < text.len() {
        out.push_str(&text[cursor..]);
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn clean_title(stripped: &str, raw: &str) -> String {
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '-' | '،'));
    if trimmed.chars().count() >= 2 {
        return capitalize(trimmed);
    }

    tracing::debug!(raw, "title stripped too far, keeping raw input");
    if raw.trim().is_empty() {
        "Untitled".to_string()
    } else {
        raw.to_string()
    }
}

/// Extract a draft task from free text. Priority is always Normal.
pub fn parse_free_text<Z: TimeZone>(text: &str, now: DateTime<Utc>, tz: &Z) -> TaskDraft {
    let normalized = normalize_digits(text);
    let mut spans = Vec::new();

    let category = classify(&normalized);

    let tomorrow_spans = word_spans(&TOMORROW_RE, &normalized);
    let tomorrow = !tomorrow_spans.is_empty();
    spans.extend(tomorrow_spans);
    spans.extend(word_spans(&TODAY_RE, &normalized));

    let estimated_minutes = parse_duration(&normalized, &mut spans);
    let time = parse_time(&normalized, &mut spans);

    let days = if tomorrow { 1 } else { 0 };
    let deadline = match time {
        Some(t) => local_day(now, tz)
            .checked_add_days(Days::new(days))
            .and_then(|day| tz.from_local_datetime(&day.and_time(t)).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now + chrono::Duration::days(days as i64)),
        None => now + chrono::Duration::days(days as i64),
    };

    let title = clean_title(&strip_spans(&normalized, spans), text);

    TaskDraft {
        title,
        category,
        priority: Priority::Normal,
        estimated_minutes,
        deadline,
        time,
        is_completed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn parse(text: &str) -> TaskDraft {
        parse_free_text(text, now(), &Utc)
    }

    #[test]
    fn study_tomorrow_for_two_hours() {
        let d = parse("study math tomorrow for 2 hours");
        assert_eq!(d.category, Category::Study);
        assert_eq!(d.estimated_minutes, 120);
        assert_eq!(d.deadline.date_naive(), now().date_naive().succ_opt().unwrap());
        assert_eq!(d.title, "Study math");
        assert_eq!(d.priority, Priority::Normal);
        assert!(!d.is_completed);
    }

    #[test]
    fn category_order_prefers_study_over_work() {
        assert_eq!(classify("work on exam prep"), Category::Study);
        assert_eq!(classify("client meetings"), Category::Work);
        assert_eq!(classify("buy groceries"), Category::Other);
        assert_eq!(classify("ready the slides"), Category::Other);
    }

    #[test]
    fn arabic_keywords_match_with_attached_prefixes() {
        assert_eq!(classify("والمذاكرة للامتحان"), Category::Study);
        assert_eq!(classify("صلاة الفجر"), Category::Prayer);
        assert_eq!(classify("اجتماع مع الفريق"), Category::Work);
        assert_eq!(classify("حل الواجب"), Category::Study);
    }

    #[test]
    fn every_rule_vocabulary_classifies_to_its_own_category() {
        for rule in CATEGORY_RULES {
            let earlier: Vec<Category> = CATEGORY_RULES
                .iter()
                .take_while(|r| r.category != rule.category)
                .map(|r| r.category)
                .collect();
            for word in rule.words {
                let got = classify(word);
                assert!(got == rule.category || earlier.contains(&got), "{word} -> {got}");
            }
        }
    }

    #[test]
    fn hours_take_precedence_over_minutes() {
        let d = parse("report 1.5 hours 20 minutes");
        assert_eq!(d.estimated_minutes, 90);
        assert_eq!(d.title, "Report");

        assert_eq!(parse("walk 20 min").estimated_minutes, 20);
        assert_eq!(parse("call mom").estimated_minutes, DEFAULT_MINUTES);
    }

    #[test]
    fn arabic_duration_and_digits() {
        let d = parse("مذاكرة لمدة ٣ ساعات بكرة");
        assert_eq!(d.category, Category::Study);
        assert_eq!(d.estimated_minutes, 180);
        assert_eq!(d.title, "مذاكرة");
        assert_eq!(d.deadline, now() + chrono::Duration::days(1));

        assert_eq!(parse("تمرين ساعتين").estimated_minutes, 120);
        assert_eq!(parse("مشي 45 دقيقة").estimated_minutes, 45);
    }

    #[test]
    fn explicit_time_overrides_period_word() {
        let d = parse("meeting at 3:30 pm");
        assert_eq!(d.time, NaiveTime::from_hms_opt(15, 30, 0));
        assert_eq!(d.title, "Meeting");
        assert_eq!(d.deadline.hour(), 15);

        let d = parse("اجتماع العصر الساعة 5");
        assert_eq!(d.time, NaiveTime::from_hms_opt(17, 0, 0));

        let d = parse("مشي الصبح");
        assert_eq!(d.time, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(d.title, "مشي");
    }

    #[test]
    fn invalid_clock_is_ignored() {
        let d = parse("call at 45");
        assert_eq!(d.time, None);
        assert_eq!(d.deadline, now());
    }

    #[test]
    fn time_with_tomorrow_lands_on_next_day() {
        let d = parse("gym tomorrow at 7am");
        assert_eq!(d.category, Category::Habit);
        assert_eq!(d.deadline, Utc.with_ymd_and_hms(2026, 3, 3, 7, 0, 0).unwrap());
        assert_eq!(d.title, "Gym");
    }

    #[test]
    fn title_falls_back_to_raw_text() {
        let d = parse("tomorrow 2 hours");
        assert_eq!(d.title, "tomorrow 2 hours");
        assert_eq!(parse("   ").title, "Untitled");
        assert_eq!(parse("x").title, "x");
        assert_eq!(parse("  tomorrow ").title, "  tomorrow ");
    }

    #[test]
    fn arabic_words_match_whole_tokens_only() {
        // "lunch" contains the letters of "tomorrow".
        let d = parse("غداء مع العائلة");
        assert_eq!(d.deadline, now());
        assert_eq!(d.title, "غداء مع العائلة");

        // "help" contains the letters of "evening".
        let d = parse("طلب المساعدة من المدير");
        assert_eq!(d.time, None);
        assert_eq!(d.title, "طلب المساعدة من المدير");
    }

    #[test]
    fn arabic_words_keep_attached_prefixes() {
        let d = parse("مراجعة التقرير وبكرة");
        assert_eq!(d.deadline, now() + chrono::Duration::days(1));
        assert!(d.title.starts_with("مراجعة التقرير"));
        assert!(!d.title.contains("بكرة"));

        let d = parse("مشي والمساء");
        assert_eq!(d.time, NaiveTime::from_hms_opt(20, 0, 0));
    }

    #[test]
    fn noon_word_moves_bare_hour_past_noon() {
        assert_eq!(parse("اجتماع الظهر الساعة 1").time, NaiveTime::from_hms_opt(13, 0, 0));
        assert_eq!(parse("اجتماع الظهر الساعة 12").time, NaiveTime::from_hms_opt(12, 0, 0));
        assert_eq!(parse("صلاة الظهر").time, NaiveTime::from_hms_opt(12, 0, 0));
    }
}
