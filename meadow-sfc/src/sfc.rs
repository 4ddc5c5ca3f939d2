use pest::Parser;
use pest::iterators::Pair;

#[derive(pest_derive::Parser)]
#[grammar = "grammar.pest"]
struct SfcParser;

#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    pub value: Option<String>, // boolean attrs allowed, e.g. `scoped`
}

/// One top-level block of a `.mdw` file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub attrs: Vec<Attr>,
    pub content: String,
}

impl Block {
    pub fn attr(&self, name: &str) -> Option<&Attr> {
        self.attrs.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sfc {
    pub template: Option<Block>,
    /// JSON initial state.
    pub state: Option<Block>,
    pub style: Option<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SfcError {
    #[error("invalid single-file component: {0}")]
    Syntax(String),
    #[error("single-file component has no <template> block")]
    MissingTemplate,
}

pub fn parse_sfc(source: &str) -> Result<Sfc, SfcError> {
    let mut sfc = Sfc::default();

    let mut pairs =
        SfcParser::parse(Rule::file, source).map_err(|e| SfcError::Syntax(e.to_string()))?;
    let file = pairs
        .next()
        .ok_or_else(|| SfcError::Syntax("empty file".into()))?;

    // Children of `file` are `block` nodes; whitespace and comments are silent.
    for node in file.into_inner() {
        if node.as_rule() != Rule::block {
            continue;
        }
        for inner in node.into_inner() {
            let slot = match inner.as_rule() {
                Rule::template => &mut sfc.template,
                Rule::state => &mut sfc.state,
                Rule::style => &mut sfc.style,
                _ => continue,
            };
            if slot.is_some() {
                tracing::warn!(block = ?inner.as_rule(), "duplicate block, the last one wins");
            }
            *slot = Some(parse_block(inner));
        }
    }

    if sfc.template.is_none() {
        return Err(SfcError::MissingTemplate);
    }
    Ok(sfc)
}

fn parse_block(block: Pair<Rule>) -> Block {
    let mut out = Block::default();
    for p in block.into_inner() {
        match p.as_rule() {
            Rule::template_open | Rule::state_open | Rule::style_open => {
                // attributes are direct children of *_open
                out.attrs.extend(
                    p.into_inner()
                        .filter(|a| a.as_rule() == Rule::attribute)
                        .map(parse_attr),
                );
            }
            Rule::template_body | Rule::state_body | Rule::style_body => {
                out.content = p.as_str().to_string();
            }
            _ => {}
        }
    }
    out
}

fn parse_attr(attr: Pair<Rule>) -> Attr {
    // attribute = ident ( "=" quoted )?
    let mut name = String::new();
    let mut value: Option<String> = None;

    for part in attr.into_inner() {
        match part.as_rule() {
            Rule::ident => name = part.as_str().to_string(),
            Rule::quoted => value = Some(strip_quotes(part.as_str())),
            _ => {}
        }
    }
    Attr { name, value }
}

fn strip_quotes(s: &str) -> String {
    let b = s.as_bytes();
    if b.len() >= 2
        && ((b[0] == b'"' && b[b.len() - 1] == b'"') || (b[0] == b'\'' && b[b.len() - 1] == b'\''))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}
