//! Parser for the PiperFlow process-map notation.
//!
//! PiperFlow is line-oriented: directives (`title:`, `footer:`, `width:`,
//! `colourtheme:`), containers (`pool:`, `lane:`), elements declared inside
//! lanes (`(start) as s`, `[Ship Order] as ship`, `<Paid?> as paid`), and
//! connection chains (`a->b->c: label`, optionally with side hints
//! `a-(bottom, top)->b`). Indentation carries no meaning.
//!
//! Parsing is strict where it matters for rendering: every element needs an
//! `as` identifier, identifiers must be unique, and connections may only
//! reference declared identifiers. Errors carry the 1-based source line.

use crate::error::{GenerateError, Result};

/// A parsed process map: the diagram-level directives, the pool/lane/element
/// tree, and the connection list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessMap {
    pub title: String,
    pub footer: Option<String>,
    pub width: Option<u32>,
    pub colour_theme: Option<String>,
    pub pools: Vec<Pool>,
    pub connections: Vec<Connection>,
}

/// A pool of lanes. Lanes declared before any `pool:` directive live in an
/// implicit anonymous pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pool {
    pub name: Option<String>,
    pub lanes: Vec<Lane>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    pub name: String,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// The `as` identifier, unique across the whole map.
    pub id: String,
    /// Display text from inside the element tag.
    pub label: String,
    pub kind: ElementKind,
}

/// Element kinds, following the tag syntax: `(...)` events, `[...]`
/// activities, `<...>` gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Start,
    End,
    Timer,
    Intermediate,
    Message,
    Signal,
    Conditional,
    Link,
    Task,
    Subprocess,
    ExclusiveGateway,
    ParallelGateway,
    InclusiveGateway,
    EventGateway,
}

impl ElementKind {
    pub fn is_event(self) -> bool {
        matches!(
            self,
            Self::Start
                | Self::End
                | Self::Timer
                | Self::Intermediate
                | Self::Message
                | Self::Signal
                | Self::Conditional
                | Self::Link
        )
    }

    pub fn is_activity(self) -> bool {
        matches!(self, Self::Task | Self::Subprocess)
    }

    pub fn is_gateway(self) -> bool {
        matches!(
            self,
            Self::ExclusiveGateway
                | Self::ParallelGateway
                | Self::InclusiveGateway
                | Self::EventGateway
        )
    }
}

/// Which edge of an element a connection attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// A directed connection between two declared elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub from: String,
    pub to: String,
    /// Label text after the trailing `:` (final segment of a chain only).
    pub label: Option<String>,
    /// Manual `(source_side, target_side)` hint, when given.
    pub sides: Option<(Side, Side)>,
}

impl ProcessMap {
    /// Look up an element anywhere in the pool/lane tree.
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements().find(|e| e.id == id)
    }

    /// Iterate every element in declaration order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.pools
            .iter()
            .flat_map(|p| p.lanes.iter())
            .flat_map(|l| l.elements.iter())
    }

    /// Total number of elements.
    pub fn element_count(&self) -> usize {
        self.elements().count()
    }
}

fn syntax(line: usize, message: impl Into<String>) -> GenerateError {
    GenerateError::Syntax {
        line,
        message: message.into(),
    }
}

/// Parse PiperFlow notation into a [`ProcessMap`].
pub fn parse(notation: &str) -> Result<ProcessMap> {
    let mut map = ProcessMap::default();
    // Connections keep their source line until endpoint validation can run.
    let mut pending: Vec<(usize, Connection)> = Vec::new();
    let mut last_line = 1;

    for (idx, raw) in notation.lines().enumerate() {
        let lineno = idx + 1;
        last_line = lineno;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(value) = line.strip_prefix("title:") {
            map.title = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("footer:") {
            map.footer = Some(value.trim().to_string());
        } else if let Some(value) = strip_directive(line, "width") {
            map.width = Some(
                value
                    .parse::<u32>()
                    .map_err(|_| syntax(lineno, format!("width is not a number: {value}")))?,
            );
        } else if let Some(value) = line.strip_prefix("colourtheme:") {
            map.colour_theme = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("pool:") {
            map.pools.push(Pool {
                name: Some(value.trim().to_string()),
                lanes: Vec::new(),
            });
        } else if let Some(value) = line.strip_prefix("lane:") {
            if map.pools.is_empty() {
                map.pools.push(Pool::default());
            }
            let pool = map.pools.last_mut().expect("pool just ensured");
            pool.lanes.push(Lane {
                name: value.trim().to_string(),
                elements: Vec::new(),
            });
        } else if line.starts_with('(') || line.starts_with('[') || line.starts_with('<') {
            let element = parse_element(line, lineno)?;
            if map.element(&element.id).is_some() {
                return Err(syntax(lineno, format!("duplicate element id: {}", element.id)));
            }
            let lane = map
                .pools
                .last_mut()
                .and_then(|p| p.lanes.last_mut())
                .ok_or_else(|| syntax(lineno, "element declared outside a lane"))?;
            lane.elements.push(element);
        } else if line.contains("->") {
            for connection in parse_chain(line, lineno)? {
                pending.push((lineno, connection));
            }
        } else {
            return Err(syntax(lineno, format!("unrecognized line: {line}")));
        }
    }

    if map.element_count() == 0 {
        return Err(syntax(last_line, "notation defines no elements"));
    }

    for (lineno, connection) in pending {
        for endpoint in [&connection.from, &connection.to] {
            if map.element(endpoint).is_none() {
                return Err(syntax(
                    lineno,
                    format!("connection references undeclared element: {endpoint}"),
                ));
            }
        }
        map.connections.push(connection);
    }

    Ok(map)
}

/// `width` appears in the wild both as `width:` and `width :`.
fn strip_directive<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(key)?;
    let rest = rest.trim_start();
    rest.strip_prefix(':').map(str::trim)
}

/// Parse one element declaration: `TAG as id`.
fn parse_element(line: &str, lineno: usize) -> Result<Element> {
    let (open, close) = match line.chars().next() {
        Some('(') => ('(', ')'),
        Some('[') => ('[', ']'),
        Some('<') => ('<', '>'),
        _ => unreachable!("caller checked the opening delimiter"),
    };

    let close_at = line
        .rfind(close)
        .filter(|&at| at > 0)
        .ok_or_else(|| syntax(lineno, format!("unterminated element tag: {line}")))?;
    let inner = line[1..close_at].trim();
    let tail = line[close_at + 1..].trim();

    let id = tail
        .strip_prefix("as ")
        .map(str::trim)
        .ok_or_else(|| syntax(lineno, format!("element is missing `as <id>`: {line}")))?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(syntax(lineno, format!("invalid element id: {id}")));
    }

    let (kind, label) = match open {
        '(' => event_kind(inner),
        '[' => match inner.strip_prefix("@subprocess") {
            Some(rest) => (ElementKind::Subprocess, rest.trim()),
            None => (ElementKind::Task, inner),
        },
        '<' => {
            if let Some(rest) = inner.strip_prefix("@parallel") {
                (ElementKind::ParallelGateway, rest.trim())
            } else if let Some(rest) = inner.strip_prefix("@inclusive") {
                (ElementKind::InclusiveGateway, rest.trim())
            } else if let Some(rest) = inner.strip_prefix("@event") {
                (ElementKind::EventGateway, rest.trim())
            } else {
                (ElementKind::ExclusiveGateway, inner)
            }
        }
        _ => unreachable!(),
    };

    Ok(Element {
        id: id.to_string(),
        label: label.to_string(),
        kind,
    })
}

fn event_kind(inner: &str) -> (ElementKind, &str) {
    if inner.eq_ignore_ascii_case("start") {
        return (ElementKind::Start, inner);
    }
    if inner.eq_ignore_ascii_case("end") {
        return (ElementKind::End, inner);
    }
    for (tag, kind) in [
        ("@timer", ElementKind::Timer),
        ("@intermediate", ElementKind::Intermediate),
        ("@message", ElementKind::Message),
        ("@signal", ElementKind::Signal),
        ("@conditional", ElementKind::Conditional),
        ("@link", ElementKind::Link),
    ] {
        if let Some(rest) = inner.strip_prefix(tag) {
            return (kind, rest.trim());
        }
    }
    // Untagged event text that is neither start nor end: treat as an
    // intermediate event rather than rejecting the whole diagram.
    (ElementKind::Intermediate, inner)
}

/// Parse a connection chain: `a->b->c`, optional trailing `: label`
/// (applies to the final segment), optional `-(side, side)` hints on any
/// segment's source.
fn parse_chain(line: &str, lineno: usize) -> Result<Vec<Connection>> {
    let segments: Vec<&str> = line.split("->").collect();
    if segments.len() < 2 {
        return Err(syntax(lineno, format!("incomplete connection: {line}")));
    }

    // Each hop's source may end with a side hint; the final hop's target may
    // carry the label.
    let mut nodes: Vec<(String, Option<(Side, Side)>)> = Vec::new();
    let mut label = None;

    for (i, raw_segment) in segments.iter().enumerate() {
        let mut segment = raw_segment.trim().to_string();

        if i == segments.len() - 1 {
            if let Some(colon) = segment.find(':') {
                label = Some(segment[colon + 1..].trim().to_string());
                segment = segment[..colon].trim_end().to_string();
            }
        }

        let mut sides = None;
        if segment.ends_with(')') {
            if let Some(open) = segment.rfind("-(") {
                let hint = &segment[open + 2..segment.len() - 1];
                sides = Some(parse_sides(hint, lineno)?);
                segment = segment[..open].trim_end().to_string();
            }
        }

        if segment.is_empty() {
            return Err(syntax(lineno, format!("empty endpoint in connection: {line}")));
        }
        nodes.push((segment, sides));
    }

    let mut connections = Vec::new();
    for window in 0..nodes.len() - 1 {
        let (from, sides) = nodes[window].clone();
        let (to, _) = nodes[window + 1].clone();
        connections.push(Connection {
            from,
            to,
            label: if window == nodes.len() - 2 {
                label.clone()
            } else {
                None
            },
            sides,
        });
    }
    Ok(connections)
}

fn parse_sides(hint: &str, lineno: usize) -> Result<(Side, Side)> {
    let mut parts = hint.split(',');
    let source = parts.next().and_then(Side::parse);
    let target = parts.next().and_then(Side::parse);
    match (source, target, parts.next()) {
        (Some(s), Some(t), None) => Ok((s, t)),
        _ => Err(syntax(lineno, format!("invalid connection side hint: ({hint})"))),
    }
}
