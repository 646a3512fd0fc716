//! Грамматика аргументов команды `notice`.
//!
//! ```text
//! <title> [--context=<text>] [--allow-break=<bool>]
//!         [--mask-duration=<secs>] [--overlay-duration=<secs>]
//! ```
//!
//! Разбор никогда не падает: отсутствующие или битые значения заменяются
//! значениями по умолчанию, незнакомые `--` флаги игнорируются.
//! При повторе флага выигрывает первое принятое значение; проигнорированное
//! значение не считается.
//!
//! Длительности принимаются только конечные и неотрицательные: `NaN`, `inf`
//! и отрицательные числа считаются битыми и оставляют значение по умолчанию.

const CONTEXT: &str = "--context=";
const ALLOW_BREAK: &str = "--allow-break=";
const MASK_DURATION: &str = "--mask-duration=";
const OVERLAY_DURATION: &str = "--overlay-duration=";

/// `--mask-duration` по умолчанию, секунды
pub const DEFAULT_MASK_DURATION: f64 = 3.0;
/// `--overlay-duration` по умолчанию, секунды
pub const DEFAULT_OVERLAY_DURATION: f64 = 5.0;

/// Параметры уведомления, выведенные из `args`
#[derive(Debug, Clone, PartialEq)]
pub struct NoticeParams {
    /// Обязателен для успешной команды; пустая строка = не задан
    pub title: String,
    /// Пояснение к уведомлению, может быть пустым
    pub context: String,
    /// `true` -> ответ 200, `false` -> 202
    pub allow_break: bool,
    /// Секунды
    pub mask_duration: f64,
    /// Секунды
    pub overlay_duration: f64,
}

impl Default for NoticeParams {
    fn default() -> Self {
        Self {
            title: String::new(),
            context: String::new(),
            allow_break: true,
            mask_duration: DEFAULT_MASK_DURATION,
            overlay_duration: DEFAULT_OVERLAY_DURATION,
        }
    }
}

/// Какие флаги уже приняты
#[derive(Default)]
struct Seen {
    context: bool,
    allow_break: bool,
    mask_duration: bool,
    overlay_duration: bool,
}

impl NoticeParams {
    /// Разбирает токены `args`; никогда не падает
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Self {
        let mut out = Self::default();
        let mut seen = Seen::default();

        for token in args.iter().map(AsRef::as_ref) {
            if let Some(v) = token.strip_prefix(CONTEXT) {
                if !seen.context {
                    out.context = v.to_string();
                    seen.context = true;
                }
            } else if let Some(v) = token.strip_prefix(ALLOW_BREAK) {
                if !seen.allow_break {
                    out.allow_break = v.eq_ignore_ascii_case("true");
                    seen.allow_break = true;
                }
            } else if let Some(v) = token.strip_prefix(MASK_DURATION) {
                if !seen.mask_duration {
                    if let Some(secs) = parse_secs(v) {
                        out.mask_duration = secs;
                        seen.mask_duration = true;
                    }
                }
            } else if let Some(v) = token.strip_prefix(OVERLAY_DURATION) {
                if !seen.overlay_duration {
                    if let Some(secs) = parse_secs(v) {
                        out.overlay_duration = secs;
                        seen.overlay_duration = true;
                    }
                }
            } else if token.starts_with("--") {
                // незнакомый флаг, пропускаем
            } else if out.title.is_empty() {
                out.title = token.to_string();
            }
        }

        out
    }

    /// Каноническая форма токенов; `parse(to_args())` даёт те же параметры
    /// (кроме заголовков, начинающихся с `--`).
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(5);
        if !self.title.is_empty() {
            args.push(self.title.clone());
        }
        if !self.context.is_empty() {
            args.push(format!("{CONTEXT}{}", self.context));
        }
        args.push(format!("{ALLOW_BREAK}{}", self.allow_break));
        args.push(format!("{MASK_DURATION}{}", self.mask_duration));
        args.push(format!("{OVERLAY_DURATION}{}", self.overlay_duration));
        args
    }
}

fn parse_secs(raw: &str) -> Option<f64> {
    let secs = raw.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> NoticeParams {
        NoticeParams::parse(args)
    }

    #[test]
    fn empty_args_give_defaults() {
        let p = parse(&[]);
        assert_eq!(p, NoticeParams::default());
        assert!(p.title.is_empty());
        assert!(p.allow_break);
        assert_eq!(p.mask_duration, 3.0);
        assert_eq!(p.overlay_duration, 5.0);
    }

    #[test]
    fn parses_all_flags() {
        let p = parse(&[
            "Break time",
            "--context=after lesson 2",
            "--allow-break=FALSE",
            "--mask-duration=1.5",
            "--overlay-duration=10",
        ]);
        assert_eq!(p.title, "Break time");
        assert_eq!(p.context, "after lesson 2");
        assert!(!p.allow_break);
        assert_eq!(p.mask_duration, 1.5);
        assert_eq!(p.overlay_duration, 10.0);
    }

    #[test]
    fn allow_break_is_true_only_for_true() {
        assert!(parse(&["T", "--allow-break=True"]).allow_break);
        assert!(parse(&["T", "--allow-break=tRuE"]).allow_break);
        assert!(!parse(&["T", "--allow-break=yes"]).allow_break);
        assert!(!parse(&["T", "--allow-break=1"]).allow_break);
        assert!(!parse(&["T", "--allow-break="]).allow_break);
    }

    #[test]
    fn malformed_numbers_keep_defaults() {
        let p = parse(&["T", "--mask-duration=abc", "--overlay-duration="]);
        assert_eq!(p.mask_duration, DEFAULT_MASK_DURATION);
        assert_eq!(p.overlay_duration, DEFAULT_OVERLAY_DURATION);
        assert_eq!(p.title, "T");
    }

    #[test]
    fn non_finite_and_negative_durations_keep_defaults() {
        for bad in ["NaN", "nan", "inf", "-inf", "infinity", "-1", "-0.5"] {
            let mask = format!("--mask-duration={bad}");
            let overlay = format!("--overlay-duration={bad}");
            let p = parse(&["T", &mask, &overlay]);
            assert_eq!(p.mask_duration, DEFAULT_MASK_DURATION, "{bad}");
            assert_eq!(p.overlay_duration, DEFAULT_OVERLAY_DURATION, "{bad}");

            // канонический вид разбирается в то же самое
            assert_eq!(NoticeParams::parse(&p.to_args()), p, "{bad}");
        }

        let p = parse(&["T", "--mask-duration=0", "--overlay-duration= 2.5 "]);
        assert_eq!(p.mask_duration, 0.0);
        assert_eq!(p.overlay_duration, 2.5);
    }

    #[test]
    fn ignored_number_does_not_block_later_valid_one() {
        let p = parse(&["T", "--mask-duration=abc", "--mask-duration=2"]);
        assert_eq!(p.mask_duration, 2.0);
    }

    #[test]
    fn first_occurrence_wins() {
        let p = parse(&[
            "T",
            "--context=first",
            "--context=second",
            "--allow-break=false",
            "--allow-break=true",
            "--overlay-duration=1",
            "--overlay-duration=2",
        ]);
        assert_eq!(p.context, "first");
        assert!(!p.allow_break);
        assert_eq!(p.overlay_duration, 1.0);
    }

    #[test]
    fn first_non_flag_token_is_title() {
        let p = parse(&["--context=c", "First", "Second"]);
        assert_eq!(p.title, "First");
    }

    #[test]
    fn empty_token_does_not_claim_title() {
        let p = parse(&["", "Real"]);
        assert_eq!(p.title, "Real");
    }

    #[test]
    fn unknown_flags_are_ignored() {
        let p = parse(&["--colour=red", "--allow-break", "T", "--future"]);
        assert_eq!(p.title, "T");
        assert!(p.allow_break);
    }

    #[test]
    fn context_value_keeps_equals_signs() {
        let p = parse(&["T", "--context=a=b"]);
        assert_eq!(p.context, "a=b");
    }

    #[test]
    fn only_flags_leave_title_empty() {
        let p = parse(&["--context=oops"]);
        assert!(p.title.is_empty());
        assert_eq!(p.context, "oops");
    }

    #[test]
    fn reparse_of_canonical_form_is_identical() {
        let first = parse(&["T", "--allow-break=true"]);
        let again = NoticeParams::parse(&first.to_args());
        assert_eq!(again, first);

        let first = parse(&[
            "Урок окончен",
            "--context=5 класс",
            "--allow-break=false",
            "--mask-duration=0.25",
        ]);
        let again = NoticeParams::parse(&first.to_args());
        assert_eq!(again, first);
    }
}
