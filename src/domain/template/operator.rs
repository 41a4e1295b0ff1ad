// Expression operators and their expansion rules

/// The operator character that may open a `{...}` expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    PathParam,
    Query,
    QueryContinuation,
}

/// How values are percent-encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Everything except RFC 3986 unreserved characters is escaped
    Strict,
    /// Reserved characters and existing `%XX` triplets pass through
    Reserved,
}

/// Fixed expansion behaviour for one operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorRules {
    pub prefix: &'static str,
    pub separator: &'static str,
    pub encoding: Encoding,
    /// Emit `name=` labels
    pub named: bool,
    /// Drop the `=` after a label when the value is empty
    pub trim_empty: bool,
}

impl OperatorRules {
    /// Separator between values, falling back to `,` when the operator has none
    pub fn joiner(&self) -> &'static str {
        if self.separator.is_empty() {
            ","
        } else {
            self.separator
        }
    }

    pub fn encode(&self, value: &str) -> String {
        match self.encoding {
            Encoding::Strict => encode_strict(value),
            Encoding::Reserved => encode_reserved(value),
        }
    }

    pub fn is_strict(&self) -> bool {
        self.encoding == Encoding::Strict
    }
}

impl Operator {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Operator::Reserved),
            '#' => Some(Operator::Fragment),
            '.' => Some(Operator::Label),
            '/' => Some(Operator::Path),
            ';' => Some(Operator::PathParam),
            '?' => Some(Operator::Query),
            '&' => Some(Operator::QueryContinuation),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Operator::Simple => None,
            Operator::Reserved => Some('+'),
            Operator::Fragment => Some('#'),
            Operator::Label => Some('.'),
            Operator::Path => Some('/'),
            Operator::PathParam => Some(';'),
            Operator::Query => Some('?'),
            Operator::QueryContinuation => Some('&'),
        }
    }

    pub fn rules(&self) -> OperatorRules {
        let (prefix, separator, encoding, named, trim_empty) = match self {
            Operator::Simple => ("", "", Encoding::Strict, false, false),
            Operator::Reserved => ("", "", Encoding::Reserved, false, false),
            Operator::Fragment => ("#", "", Encoding::Reserved, false, false),
            Operator::Label => (".", ".", Encoding::Strict, false, false),
            Operator::Path => ("/", "/", Encoding::Strict, false, false),
            Operator::PathParam => (";", ";", Encoding::Strict, true, true),
            Operator::Query => ("?", "&", Encoding::Strict, true, false),
            Operator::QueryContinuation => ("&", "&", Encoding::Strict, true, false),
        };
        OperatorRules {
            prefix,
            separator,
            encoding,
            named,
            trim_empty,
        }
    }
}

/// `encodeURIComponent` escaping with `!` escaped as well: only
/// `A-Z a-z 0-9 - _ . ~ * ' ( )` pass through
pub fn encode_strict(value: &str) -> String {
    // Every `%` in the output opens a triplet, so these replacements never
    // touch an escaped `%`
    urlencoding::encode(value)
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

/// Percent-encode all but unreserved and reserved characters, keeping
/// existing percent-encoded triplets intact
pub fn encode_reserved(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            out.push_str(&value[i..i + 3]);
            i += 3;
            continue;
        }
        if is_unreserved(b) || is_reserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
        i += 1;
    }

    out
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn is_reserved(b: u8) -> bool {
    matches!(
        b,
        b':' | b'/'
            | b'?'
            | b'#'
            | b'['
            | b']'
            | b'@'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
    )
}
