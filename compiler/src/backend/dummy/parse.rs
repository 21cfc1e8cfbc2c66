//! Declaration-level PSSL parsing for the reference toolchain.
//!
//! Nothing here understands expressions. A source is cut into top-level
//! statements by brace depth, and each statement is classified by its shape:
//! struct, constant buffer, resource, sampler, function or anything else.

use std::sync::LazyLock;

use regex::Regex;

/// A preprocessor line, blanked out of the source it was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub line: u32,
    pub text: String,
}

/// One top-level statement and its byte offset in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement<'a> {
    pub text: &'a str,
    pub offset: usize,
}

/// A struct or constant-buffer member, or a function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub qualifiers: Vec<String>,
    pub ty: String,
    pub name: String,
    pub count: Option<u32>,
    pub semantic: Option<String>,
}

impl Member {
    pub fn has_qualifier(&self, qualifier: &str) -> bool {
        self.qualifiers.iter().any(|q| q == qualifier)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    /// `Texture*`, sampled through a sampler state.
    Texture,
    /// `RegularBuffer`, `ByteBuffer`.
    Buffer,
    /// Any `RW_` type.
    ReadWrite,
    Sampler,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Struct {
        name: String,
        members: Vec<Member>,
    },
    /// `ConstantBuffer Name { members }`.
    ConstantBlock {
        name: String,
        members: Vec<Member>,
    },
    /// `ConstantBuffer<T> name;`.
    TypedConstantBuffer {
        ty: String,
        name: String,
    },
    Resource {
        class: ResourceClass,
        ty: String,
        element: Option<String>,
        name: String,
        count: Option<u32>,
    },
    Function {
        name: String,
        params: Vec<Member>,
        semantic: Option<String>,
        body: String,
    },
    Other,
}

/// Replace comments with spaces, keeping newlines so offsets map to lines.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                out.push(' ');
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                    out.push(' ');
                }
            }
            ('/', Some('*')) => {
                chars.next();
                out.push_str("  ");
                let mut prev = '\0';
                for c in chars.by_ref() {
                    out.push(if c == '\n' { '\n' } else { ' ' });
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Take every `#` line out of `source`.
pub fn split_directives(source: &str) -> (String, Vec<Directive>) {
    let mut text = String::with_capacity(source.len());
    let mut directives = Vec::new();
    for (index, line) in source.split_inclusive('\n').enumerate() {
        if line.trim_start().starts_with('#') {
            directives.push(Directive {
                line: index as u32 + 1,
                text: line.trim().to_owned(),
            });
            text.extend(line.chars().map(|c| if c == '\n' { '\n' } else { ' ' }));
        } else {
            text.push_str(line);
        }
    }
    (text, directives)
}

/// Cut `source` into top-level statements.
///
/// A statement ends at a `;` outside braces, or at the `}` closing its
/// outermost brace (taking a directly following `;` along). Unbalanced braces
/// return the offset of the offending character.
pub fn split_statements(source: &str) -> Result<Vec<Statement<'_>>, usize> {
    let bytes = source.as_bytes();
    let mut statements = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut open_at = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                if depth == 0 {
                    open_at = i;
                }
                depth += 1;
            }
            b'}' => {
                if depth == 0 {
                    return Err(i);
                }
                depth -= 1;
                if depth == 0 {
                    let mut end = i + 1;
                    let rest = &source[end..];
                    let skipped = rest.len() - rest.trim_start().len();
                    if rest[skipped..].starts_with(';') {
                        end += skipped + 1;
                    }
                    push_statement(source, start, end, &mut statements);
                    start = end;
                    i = end;
                    continue;
                }
            }
            b';' if depth == 0 => {
                push_statement(source, start, i + 1, &mut statements);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if depth != 0 {
        return Err(open_at);
    }
    if !source[start..].trim().is_empty() {
        return Err(start + (source[start..].len() - source[start..].trim_start().len()));
    }
    Ok(statements)
}

fn push_statement<'a>(source: &'a str, start: usize, end: usize, out: &mut Vec<Statement<'a>>) {
    let raw = &source[start..end];
    let text = raw.trim();
    if text.is_empty() || text == ";" {
        return;
    }
    out.push(Statement {
        text,
        offset: start + (raw.len() - raw.trim_start().len()),
    });
}

/// 1-based `(line, column)` of a byte offset.
pub fn line_col(source: &str, offset: usize) -> (u32, u32) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() as u32 + 1;
    let column = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) as u32 + 1;
    (line, column)
}

static STRUCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^struct\s+(\w+)\s*\{(.*)\}\s*;?$").expect("invalid struct pattern")
});

static CONSTANT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^ConstantBuffer\s+(\w+)\s*\{(.*)\}\s*;?$").expect("invalid cbuffer pattern")
});

static TYPED_CONSTANT_BUFFER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ConstantBuffer\s*<\s*(\w+)\s*>\s*(\w+)\s*;$")
        .expect("invalid typed cbuffer pattern")
});

static RESOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\w+\s+)*?(RW_Texture\w*|Texture\w*|RW_RegularBuffer|RegularBuffer|RW_ByteBuffer|ByteBuffer|SamplerComparisonState|SamplerState)\s*(?:<\s*([^>]*?)\s*>)?\s+(\w+)\s*(?:\[\s*(\d+)\s*\])?\s*;$",
    )
    .expect("invalid resource pattern")
});

static FUNCTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:\[[^\]]*\]\s*)*[\w\s<>,]*?\b(\w+)\s*\(([^)]*)\)\s*(?::\s*(\w+))?\s*$")
        .expect("invalid function pattern")
});

static MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:\w+\s+)*?)(\w+)\s+(\w+)\s*(?:\[\s*(\d+)\s*\])?\s*(?::\s*(\w+))?$")
        .expect("invalid member pattern")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_]\w*").expect("invalid identifier pattern"));

/// Classify one statement.
pub fn classify(statement: &str) -> Declaration {
    if let Some(caps) = STRUCT.captures(statement) {
        return Declaration::Struct {
            name: caps[1].to_owned(),
            members: parse_members(&caps[2], ';'),
        };
    }
    if let Some(caps) = CONSTANT_BLOCK.captures(statement) {
        return Declaration::ConstantBlock {
            name: caps[1].to_owned(),
            members: parse_members(&caps[2], ';'),
        };
    }
    if let Some(caps) = TYPED_CONSTANT_BUFFER.captures(statement) {
        return Declaration::TypedConstantBuffer {
            ty: caps[1].to_owned(),
            name: caps[2].to_owned(),
        };
    }
    if let Some(caps) = RESOURCE.captures(statement) {
        let ty = caps[1].to_owned();
        let class = if ty.starts_with("RW_") {
            ResourceClass::ReadWrite
        } else if ty.starts_with("Texture") {
            ResourceClass::Texture
        } else if ty.starts_with("Sampler") {
            ResourceClass::Sampler
        } else {
            ResourceClass::Buffer
        };
        return Declaration::Resource {
            class,
            ty,
            element: caps.get(2).map(|m| m.as_str().to_owned()),
            name: caps[3].to_owned(),
            count: caps.get(4).and_then(|m| m.as_str().parse().ok()),
        };
    }
    if statement.ends_with('}') {
        if let Some(brace) = statement.find('{') {
            if let Some(caps) = FUNCTION_HEADER.captures(statement[..brace].trim()) {
                return Declaration::Function {
                    name: caps[1].to_owned(),
                    params: parse_members(&caps[2], ','),
                    semantic: caps.get(3).map(|m| m.as_str().to_owned()),
                    body: statement[brace..].to_owned(),
                };
            }
        }
    }
    Declaration::Other
}

/// Parse `separator`-delimited declarations such as struct members or
/// function parameters. Entries that do not look like declarations are skipped.
pub fn parse_members(text: &str, separator: char) -> Vec<Member> {
    text.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|decl| {
            let caps = MEMBER.captures(decl)?;
            Some(Member {
                qualifiers: caps[1].split_whitespace().map(str::to_owned).collect(),
                ty: caps[2].to_owned(),
                name: caps[3].to_owned(),
                count: caps.get(4).and_then(|m| m.as_str().parse().ok()),
                semantic: caps.get(5).map(|m| m.as_str().to_owned()),
            })
        })
        .collect()
}

/// Every identifier-shaped token of `text`.
pub fn identifiers(text: &str) -> impl Iterator<Item = &str> {
    IDENTIFIER.find_iter(text).map(|m| m.as_str())
}
