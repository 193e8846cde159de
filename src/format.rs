//! Printf-style rendering.
//!
//! A format string is scanned once, left to right. Literal runs are copied
//! through untouched; each `%`-introduced placeholder ends at its verb
//! character and renders the next positional [`Arg`]. `%%` is a literal
//! percent sign. Inside a placeholder `\` is the escape marker: `\\` produces
//! one literal backslash ahead of the rendered value.

use core::any::type_name;
use core::fmt::{self, Debug, Display, Write as _};
use std::iter;
use std::time::Duration;

use crate::error::FormatError;

/// Opens a placeholder.
pub const PLACEHOLDER: u8 = b'%';
/// Escape marker recognised inside a placeholder.
pub const ESCAPE: u8 = b'\\';

const MAX_WIDTH: usize = 1_000_000;

#[inline]
const fn is_verb(b: u8) -> bool {
    matches!(
        b,
        b'd' | b'f'
            | b'v'
            | b'b'
            | b'o'
            | b'x'
            | b'X'
            | b'c'
            | b'p'
            | b't'
            | b's'
            | b'T'
            | b'q'
            | b'U'
            | b'e'
            | b'E'
            | b'g'
            | b'G'
    )
}

#[derive(Clone, Copy)]
enum Value<'a> {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(&'a str),
    Duration(Duration),
    Ptr(usize),
    Display(&'a dyn Display),
    Debug(&'a dyn Debug),
}

/// One positional argument for a formatted write.
///
/// Built with `From` for integers, floats, `bool`, `char`, strings,
/// [`Duration`] and raw pointers, or with [`Arg::display`] / [`Arg::debug`]
/// for anything else. The original type name is kept for `%T`.
#[derive(Clone, Copy)]
pub struct Arg<'a> {
    value: Value<'a>,
    type_name: &'static str,
}

impl<'a> Arg<'a> {
    /// Render `v` through its `Display` impl.
    pub fn display<T: Display>(v: &'a T) -> Self {
        Self {
            value: Value::Display(v),
            type_name: type_name::<T>(),
        }
    }

    /// Render `v` through its `Debug` impl (`%v` only).
    pub fn debug<T: Debug>(v: &'a T) -> Self {
        Self {
            value: Value::Debug(v),
            type_name: type_name::<T>(),
        }
    }

    /// Type name of the value this argument was built from.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arg").field("type", &self.type_name).finish()
    }
}

macro_rules! arg_from {
    ($variant:ident as $conv:ty: $($t:ty),+) => {$(
        impl From<$t> for Arg<'_> {
            #[inline]
            #[allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::unnecessary_cast)]
            fn from(v: $t) -> Self {
                Self { value: Value::$variant(v as $conv), type_name: type_name::<$t>() }
            }
        }
    )+};
}

arg_from!(Int as i64: i8, i16, i32, i64, isize);
arg_from!(Uint as u64: u8, u16, u32, u64, usize);
arg_from!(Float as f64: f32, f64);

impl From<bool> for Arg<'_> {
    fn from(v: bool) -> Self {
        Self {
            value: Value::Bool(v),
            type_name: "bool",
        }
    }
}

impl From<char> for Arg<'_> {
    fn from(v: char) -> Self {
        Self {
            value: Value::Char(v),
            type_name: "char",
        }
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(v: &'a str) -> Self {
        Self {
            value: Value::Str(v),
            type_name: type_name::<&str>(),
        }
    }
}

impl<'a> From<&'a String> for Arg<'a> {
    fn from(v: &'a String) -> Self {
        Self {
            value: Value::Str(v),
            type_name: type_name::<String>(),
        }
    }
}

impl From<Duration> for Arg<'_> {
    fn from(v: Duration) -> Self {
        Self {
            value: Value::Duration(v),
            type_name: type_name::<Duration>(),
        }
    }
}

impl<T: ?Sized> From<*const T> for Arg<'_> {
    fn from(v: *const T) -> Self {
        Self {
            value: Value::Ptr(v.cast::<()>() as usize),
            type_name: type_name::<*const T>(),
        }
    }
}

impl<T: ?Sized> From<*mut T> for Arg<'_> {
    fn from(v: *mut T) -> Self {
        Self {
            value: Value::Ptr(v.cast::<()>() as usize),
            type_name: type_name::<*mut T>(),
        }
    }
}

// ===== Modifier: flags, width, precision =====
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
struct Spec {
    minus: bool,
    plus: bool,
    sharp: bool,
    zero: bool,
    space: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

impl Spec {
    fn parse(modifier: &[u8]) -> Option<Self> {
        let mut spec = Self::default();
        let mut it = modifier
            .iter()
            .copied()
            .filter(|&b| b != ESCAPE)
            .peekable();
        while let Some(&b) = it.peek() {
            match b {
                b'-' => spec.minus = true,
                b'+' => spec.plus = true,
                b'#' => spec.sharp = true,
                b'0' => spec.zero = true,
                b' ' => spec.space = true,
                _ => break,
            }
            it.next();
        }
        spec.width = digits(&mut it)?;
        if it.next_if_eq(&b'.').is_some() {
            spec.precision = Some(digits(&mut it)?.unwrap_or(0));
        }
        it.next().is_none().then_some(spec)
    }
}

/// `None` on overflow past [`MAX_WIDTH`], `Some(None)` when there are no digits.
fn digits(it: &mut iter::Peekable<impl Iterator<Item = u8>>) -> Option<Option<usize>> {
    let mut n: Option<usize> = None;
    while let Some(d) = it.next_if(u8::is_ascii_digit) {
        let v = n.unwrap_or(0) * 10 + usize::from(d - b'0');
        if v > MAX_WIDTH {
            return None;
        }
        n = Some(v);
    }
    Some(n)
}

/// Render `format` against `args`, appending to `out`.
///
/// On error `out` may hold a partial rendering; the writer renders into
/// scratch space so nothing reaches the stream.
/// # Errors
/// Returns a [`FormatError`] if the placeholders and the arguments disagree.
pub fn render(format: &str, args: &[Arg<'_>], out: &mut Vec<u8>) -> Result<(), FormatError> {
    let bytes = format.as_bytes();

    // inside a placeholder, and where it began
    let mut tag = false;
    let mut tag_pos = 0;
    let mut escape = false;
    // literal escape bytes owed ahead of the current placeholder's value
    let mut escaped = 0;
    // first byte not yet copied to `out`
    let mut last = 0;
    let mut n = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if !tag {
            if b == PLACEHOLDER {
                out.extend_from_slice(&bytes[last..i]);
                tag = true;
                tag_pos = i;
                last = i;
                escape = false;
                escaped = 0;
            }
            continue;
        }
        match b {
            PLACEHOLDER if i == tag_pos + 1 => {
                out.push(PLACEHOLDER);
                tag = false;
                last = i + 1;
            }
            ESCAPE => {
                if escape {
                    escaped += 1;
                }
                escape = !escape;
            }
            v if is_verb(v) => {
                let arg = args
                    .get(n)
                    .ok_or(FormatError::MissingArgument { index: n })?;
                let spec = Spec::parse(&bytes[tag_pos + 1..i]).ok_or_else(|| {
                    FormatError::InvalidModifier {
                        placeholder: format[tag_pos..=i].to_owned(),
                    }
                })?;
                out.extend(iter::repeat(ESCAPE).take(escaped));
                render_arg(v, &spec, arg, out)?;
                n += 1;
                last = i + 1;
                tag = false;
            }
            _ => {}
        }
    }
    // unterminated placeholders fall through as literal text
    out.extend_from_slice(&bytes[last..]);

    if n == args.len() {
        Ok(())
    } else {
        Err(FormatError::ExtraArguments {
            expected: n,
            supplied: args.len(),
        })
    }
}

fn render_arg(verb: u8, spec: &Spec, arg: &Arg<'_>, out: &mut Vec<u8>) -> Result<(), FormatError> {
    let unsupported = || FormatError::UnsupportedVerb {
        verb: char::from(verb),
        type_name: arg.type_name,
    };
    let mut lead = String::new();
    let mut body = String::new();
    let mut numeric = true;

    let rendered = match (verb, arg.value) {
        (b'T', _) => {
            numeric = false;
            body.push_str(arg.type_name);
            Ok(())
        }
        (b'v', v) => generic(v, spec, &mut lead, &mut body, &mut numeric),
        (b'd', Value::Int(x)) => integer(verb, x < 0, x.unsigned_abs(), spec, &mut lead, &mut body),
        (b'd', Value::Uint(x)) => integer(verb, false, x, spec, &mut lead, &mut body),
        (b'b' | b'o' | b'x' | b'X', Value::Int(x)) => {
            integer(verb, x < 0, x.unsigned_abs(), spec, &mut lead, &mut body)
        }
        (b'b' | b'o' | b'x' | b'X', Value::Uint(x)) => {
            integer(verb, false, x, spec, &mut lead, &mut body)
        }
        (b'x' | b'X', Value::Str(s)) => {
            numeric = false;
            if spec.sharp {
                lead.push_str(if verb == b'x' { "0x" } else { "0X" });
            }
            s.bytes().try_for_each(|b| {
                if verb == b'x' {
                    write!(body, "{b:02x}")
                } else {
                    write!(body, "{b:02X}")
                }
            })
        }
        (b'c', v) => {
            numeric = false;
            body.push(scalar(v).ok_or_else(unsupported)?);
            Ok(())
        }
        (b'U', v) => {
            numeric = false;
            let cp = code_point(v).ok_or_else(unsupported)?;
            let _ = write!(body, "U+{cp:04X}");
            match char::from_u32(cp) {
                Some(c) if spec.sharp => write!(body, " '{c}'"),
                _ => Ok(()),
            }
        }
        (b'q', Value::Str(s)) => {
            numeric = false;
            write!(body, "{s:?}")
        }
        (b'q', Value::Char(c)) => {
            numeric = false;
            write!(body, "{c:?}")
        }
        (b's', v) => {
            numeric = false;
            let r = match v {
                Value::Str(s) => {
                    body.push_str(s);
                    Ok(())
                }
                Value::Char(c) => {
                    body.push(c);
                    Ok(())
                }
                Value::Display(d) => write!(body, "{d}"),
                Value::Duration(d) => write!(body, "{}", HumanDuration(d)),
                _ => return Err(unsupported()),
            };
            truncate_chars(&mut body, spec.precision);
            r
        }
        (b't', Value::Bool(x)) => {
            numeric = false;
            body.push_str(if x { "true" } else { "false" });
            Ok(())
        }
        (b't', Value::Duration(d)) => {
            numeric = false;
            write!(body, "{}", HumanDuration(d))
        }
        (b'p', Value::Ptr(p)) => {
            if !spec.sharp {
                lead.push_str("0x");
            }
            write!(body, "{p:x}")
        }
        (b'f' | b'e' | b'E' | b'g' | b'G', Value::Float(x)) => {
            numeric = float(verb, x, spec, &mut lead, &mut body);
            Ok(())
        }
        _ => return Err(unsupported()),
    };
    // only a user impl can fail a write into a String
    rendered.map_err(|fmt::Error| FormatError::ValueFormat {
        type_name: arg.type_name,
    })?;

    pad(out, spec, &lead, &body, numeric);
    Ok(())
}

fn sign(lead: &mut String, negative: bool, spec: &Spec) {
    if negative {
        lead.push('-');
    } else if spec.plus {
        lead.push('+');
    } else if spec.space {
        lead.push(' ');
    }
}

fn integer(
    verb: u8,
    negative: bool,
    x: u64,
    spec: &Spec,
    lead: &mut String,
    body: &mut String,
) -> fmt::Result {
    sign(lead, negative, spec);
    if spec.sharp {
        lead.push_str(match verb {
            b'b' => "0b",
            b'o' => "0o",
            b'x' => "0x",
            b'X' => "0X",
            _ => "",
        });
    }
    match verb {
        b'b' => write!(body, "{x:b}")?,
        b'o' => write!(body, "{x:o}")?,
        b'x' => write!(body, "{x:x}")?,
        b'X' => write!(body, "{x:X}")?,
        _ => write!(body, "{x}")?,
    }
    // precision on integers is a minimum digit count
    if let Some(p) = spec.precision {
        if body.len() < p {
            body.insert_str(0, &"0".repeat(p - body.len()));
        }
    }
    Ok(())
}

fn generic(
    v: Value<'_>,
    spec: &Spec,
    lead: &mut String,
    body: &mut String,
    numeric: &mut bool,
) -> fmt::Result {
    match v {
        Value::Int(x) => return integer(b'd', x < 0, x.unsigned_abs(), spec, lead, body),
        Value::Uint(x) => return integer(b'd', false, x, spec, lead, body),
        Value::Float(x) => {
            *numeric = float(b'g', x, spec, lead, body);
            return Ok(());
        }
        Value::Ptr(p) => {
            lead.push_str("0x");
            return write!(body, "{p:x}");
        }
        _ => *numeric = false,
    }
    match v {
        Value::Bool(x) => write!(body, "{x}"),
        Value::Char(c) if spec.sharp => write!(body, "{c:?}"),
        Value::Char(c) => write!(body, "{c}"),
        Value::Str(s) if spec.sharp => write!(body, "{s:?}"),
        Value::Str(s) => write!(body, "{s}"),
        Value::Duration(d) if spec.sharp => write!(body, "{d:?}"),
        Value::Duration(d) => write!(body, "{}", HumanDuration(d)),
        Value::Display(d) => write!(body, "{d}"),
        Value::Debug(d) if spec.sharp => write!(body, "{d:#?}"),
        Value::Debug(d) => write!(body, "{d:?}"),
        Value::Int(_) | Value::Uint(_) | Value::Float(_) | Value::Ptr(_) => Ok(()),
    }
}

fn scalar(v: Value<'_>) -> Option<char> {
    match v {
        Value::Char(c) => Some(c),
        _ => code_point(v).and_then(char::from_u32),
    }
}

fn code_point(v: Value<'_>) -> Option<u32> {
    match v {
        Value::Char(c) => Some(u32::from(c)),
        Value::Int(x) => u32::try_from(x).ok(),
        Value::Uint(x) => u32::try_from(x).ok(),
        _ => None,
    }
}

fn truncate_chars(s: &mut String, max: Option<usize>) {
    if let Some((idx, _)) = max.and_then(|m| s.char_indices().nth(m)) {
        s.truncate(idx);
    }
}

/// Returns whether the result may be zero-padded (finite values only).
fn float(verb: u8, x: f64, spec: &Spec, lead: &mut String, body: &mut String) -> bool {
    sign(lead, x.is_sign_negative() && !x.is_nan(), spec);
    let a = x.abs();
    if a.is_nan() {
        body.push_str("NaN");
        return false;
    }
    if a.is_infinite() {
        if lead.is_empty() {
            lead.push('+');
        }
        body.push_str("Inf");
        return false;
    }
    let upper = verb.is_ascii_uppercase();
    match verb {
        b'f' => {
            let _ = write!(body, "{:.*}", spec.precision.unwrap_or(6), a);
        }
        b'e' | b'E' => {
            let sci = format!("{:.*e}", spec.precision.unwrap_or(6), a);
            let (mantissa, exp) = split_exp(&sci);
            push_exp(body, mantissa, exp, upper);
        }
        _ => general(body, a, spec, upper),
    }
    true
}

/// `%g`: shortest form, switching to an exponent when it is very small or
/// reaches the precision (6 when unset).
fn general(body: &mut String, a: f64, spec: &Spec, upper: bool) {
    let sci = match spec.precision {
        Some(p) => format!("{:.*e}", p.max(1) - 1, a),
        None => format!("{a:e}"),
    };
    let (mantissa, exp) = split_exp(&sci);
    let limit = spec
        .precision
        .map_or(6, |p| i32::try_from(p.max(1)).unwrap_or(i32::MAX));
    if exp < -4 || exp >= limit {
        let mantissa = if spec.sharp { mantissa } else { strip_zeros(mantissa) };
        push_exp(body, mantissa, exp, upper);
        return;
    }
    match spec.precision {
        Some(_) => {
            let decimals = usize::try_from(limit - 1 - exp).unwrap_or(0);
            let fixed = format!("{a:.decimals$}");
            body.push_str(if spec.sharp { &fixed } else { strip_zeros(&fixed) });
        }
        None => {
            let _ = write!(body, "{a}");
        }
    }
}

fn split_exp(sci: &str) -> (&str, i32) {
    match sci.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse().unwrap_or(0)),
        None => (sci, 0),
    }
}

fn push_exp(body: &mut String, mantissa: &str, exp: i32, upper: bool) {
    let _ = write!(
        body,
        "{mantissa}{}{}{:02}",
        if upper { 'E' } else { 'e' },
        if exp < 0 { '-' } else { '+' },
        exp.unsigned_abs()
    );
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn pad(out: &mut Vec<u8>, spec: &Spec, lead: &str, body: &str, numeric: bool) {
    let len = lead.chars().count() + body.chars().count();
    let fill = spec.width.map_or(0, |w| w.saturating_sub(len));
    if spec.minus {
        out.extend_from_slice(lead.as_bytes());
        out.extend_from_slice(body.as_bytes());
        out.extend(iter::repeat(b' ').take(fill));
    } else if spec.zero && numeric {
        out.extend_from_slice(lead.as_bytes());
        out.extend(iter::repeat(b'0').take(fill));
        out.extend_from_slice(body.as_bytes());
    } else {
        out.extend(iter::repeat(b' ').take(fill));
        out.extend_from_slice(lead.as_bytes());
        out.extend_from_slice(body.as_bytes());
    }
}

/// Compact human-readable rendering of a [`Duration`], used by `%t`, `%s`
/// and `%v`.
pub struct HumanDuration(pub Duration);

impl Display for HumanDuration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.0;
        let secs = d.as_secs();
        let nanos = d.subsec_nanos();
        let ms = nanos / 1_000_000;
        if secs == 0 {
            if nanos < 1_000 {
                write!(formatter, "{nanos} ns")
            } else if nanos < 1_000_000 {
                write!(formatter, "{} us", nanos / 1_000)
            } else {
                let us = (nanos / 1_000) % 1_000;
                write!(formatter, "{ms}.{us:03} ms")
            }
        } else if secs < 60 {
            write!(formatter, "{secs}.{ms:03} s")
        } else if secs < 3_600 {
            write!(formatter, "{}m{:02}.{ms:03}s", secs / 60, secs % 60)
        } else if secs < 86_400 {
            let (h, m, s) = (secs / 3_600, (secs % 3_600) / 60, secs % 60);
            write!(formatter, "{h}h{m:02}m{s:02}.{ms:03}s")
        } else {
            let (days, rem) = (secs / 86_400, secs % 86_400);
            let (h, m, s) = (rem / 3_600, (rem % 3_600) / 60, rem % 60);
            write!(formatter, "{days}d {h:02}h{m:02}m{s:02}.{ms:03}s")
        }
    }
}
