//! Lightweight scan of `#id=KEYWORD(...)` records in a STEP DATA section.
//!
//! This is only used for the relationships and annotations the B-rep reader
//! does not expose (names, assembly usage, units). It does not validate the
//! file; the full parser does that.

/// A parameter of a simple entity instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Str(String),
    Ref(u64),
    List(Vec<Param>),
    /// Anything else (`$`, `*`, enums, numbers, typed values), kept verbatim.
    Other(String),
}

impl Param {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Param::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ref_id(&self) -> Option<u64> {
        match self {
            Param::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// All references in this parameter, including nested lists.
    pub fn refs(&self) -> Vec<u64> {
        match self {
            Param::Ref(id) => vec![*id],
            Param::List(items) => items.iter().flat_map(Param::refs).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEntity {
    pub id: u64,
    /// Upper-case keyword; empty for complex (multi-type) instances.
    pub keyword: String,
    /// Top-level parameters; empty for complex instances.
    pub params: Vec<Param>,
    /// Record text after `=` with whitespace outside strings removed.
    pub body: String,
}

impl RawEntity {
    pub fn str_param(&self, index: usize) -> Option<&str> {
        self.params.get(index).and_then(Param::as_str)
    }

    pub fn ref_param(&self, index: usize) -> Option<u64> {
        self.params.get(index).and_then(Param::as_ref_id)
    }
}

/// Splits the DATA section into entity records. Statement ends inside quoted
/// strings and comments are respected.
pub fn scan_entities(raw: &str) -> Vec<RawEntity> {
    let data = match raw.find("DATA;") {
        Some(at) => &raw[at + "DATA;".len()..],
        None => raw,
    };

    let mut out = Vec::new();
    for statement in split_statements(data) {
        let Some(rest) = statement.strip_prefix('#') else {
            continue;
        };
        let Some((id_str, body)) = rest.split_once('=') else {
            continue;
        };
        let Ok(id) = id_str.trim().parse::<u64>() else {
            continue;
        };
        let body = body.to_string();
        let (keyword, params) = parse_simple_instance(&body);
        out.push(RawEntity {
            id,
            keyword,
            params,
            body,
        });
    }
    out
}

/// Statements with comments dropped and whitespace outside strings removed.
fn split_statements(data: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = data.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            current.push(c);
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    current.push('\'');
                    chars.next();
                } else {
                    in_string = false;
                }
            }
            continue;
        }
        match c {
            '\'' => {
                in_string = true;
                current.push(c);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            ';' => {
                if !current.is_empty() {
                    statements.push(std::mem::take(&mut current));
                }
            }
            c if c.is_whitespace() => {}
            c => current.push(c),
        }
    }
    statements
}

fn parse_simple_instance(body: &str) -> (String, Vec<Param>) {
    let Some(open) = body.find('(') else {
        return (String::new(), Vec::new());
    };
    let keyword = &body[..open];
    if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return (String::new(), Vec::new());
    }
    let mut parser = ParamParser {
        chars: body[open..].chars().collect(),
        pos: 0,
    };
    let params = match parser.parse_list() {
        Some(Param::List(items)) => items,
        _ => Vec::new(),
    };
    (keyword.to_ascii_uppercase(), params)
}

struct ParamParser {
    chars: Vec<char>,
    pos: usize,
}

impl ParamParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn parse_list(&mut self) -> Option<Param> {
        if self.peek() != Some('(') {
            return None;
        }
        self.pos += 1;
        let mut items = Vec::new();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Some(Param::List(items));
        }
        loop {
            items.push(self.parse_param()?);
            match self.peek()? {
                ',' => self.pos += 1,
                ')' => {
                    self.pos += 1;
                    return Some(Param::List(items));
                }
                _ => return None,
            }
        }
    }

    fn parse_param(&mut self) -> Option<Param> {
        match self.peek()? {
            '\'' => self.parse_string(),
            '(' => self.parse_list(),
            '#' => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                digits.parse().ok().map(Param::Ref)
            }
            _ => {
                // Scalar or typed value such as LENGTH_MEASURE(1.E-6).
                let start = self.pos;
                let mut depth = 0usize;
                while let Some(c) = self.peek() {
                    match c {
                        '(' => depth += 1,
                        ')' if depth == 0 => break,
                        ')' => depth -= 1,
                        ',' if depth == 0 => break,
                        '\'' => {
                            self.parse_string()?;
                            continue;
                        }
                        _ => {}
                    }
                    self.pos += 1;
                }
                Some(Param::Other(self.chars[start..self.pos].iter().collect()))
            }
        }
    }

    fn parse_string(&mut self) -> Option<Param> {
        self.pos += 1;
        let mut s = String::new();
        loop {
            let c = self.peek()?;
            self.pos += 1;
            if c == '\'' {
                if self.peek() == Some('\'') {
                    s.push('\'');
                    self.pos += 1;
                } else {
                    return Some(Param::Str(s));
                }
            } else {
                s.push(c);
            }
        }
    }
}
