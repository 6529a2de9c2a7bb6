////////////////////////////////////////////////////////////////////////////////////
// Copyright (c) 2020 DasEtwas - All Rights Reserved                               /
//      Unauthorized copying of this file, via any medium is strictly prohibited   /
//      Proprietary and confidential                                               /
////////////////////////////////////////////////////////////////////////////////////

//! Reads the Khronos XML registry into raw, not yet API-filtered tables.

use std::{collections::BTreeSet, io};

use xml::{
    attribute::OwnedAttribute,
    reader::{Events, ParserConfig, XmlEvent},
};

use super::{Binding, BlockKind, Cmd};

type ParseResult<T> = Result<T, String>;

/// A definition that may be restricted to a single API through an `api` attribute.
#[derive(Debug)]
pub struct ApiScoped<T> {
    pub api: Option<String>,
    pub inner: T,
}

#[derive(Debug)]
pub struct RawType {
    pub name: String,
    pub requires: Option<String>,
    pub decl: String,
}

#[derive(Debug)]
pub struct RawEnum {
    pub ident: String,
    pub value: String,
    pub suffix: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug)]
pub struct RawBlock {
    pub kind: BlockKind,
    pub profile: Option<String>,
    pub api: Option<String>,
    pub types: Vec<String>,
    pub enums: Vec<String>,
    pub cmds: Vec<String>,
}

#[derive(Debug)]
pub struct RawFeature {
    pub api: String,
    pub name: String,
    pub number: String,
    pub blocks: Vec<RawBlock>,
}

#[derive(Debug)]
pub struct RawExtension {
    pub name: String,
    pub supported: Vec<String>,
    pub platforms: Option<Vec<String>>,
    pub blocks: Vec<RawBlock>,
}

#[derive(Debug, Default)]
pub struct RawRegistry {
    pub types: Vec<ApiScoped<RawType>>,
    /// Every type name of every API, used to validate command signatures.
    pub type_names: BTreeSet<String>,
    pub enums: Vec<ApiScoped<RawEnum>>,
    pub cmds: Vec<Cmd>,
    pub features: Vec<RawFeature>,
    pub extensions: Vec<RawExtension>,
}

pub fn from_xml<R>(src: R) -> ParseResult<RawRegistry>
where R: io::Read {
    let events = ParserConfig::new().cdata_to_characters(true).create_reader(src).into_iter();
    let mut parser = Parser { events };

    loop {
        match parser.next()? {
            Node::Start(ref el) if el.name == "registry" => break,
            Node::Start(el) => return Err(format!("expected <registry>, found <{}>", el.name)),
            _ => {},
        }
    }

    parser.registry()
}

struct Element {
    name: String,
    attributes: Vec<OwnedAttribute>,
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|attr| attr.name.local_name == key).map(|attr| &attr.value[..])
    }

    fn owned_attr(&self, key: &str) -> Option<String> {
        self.attr(key).map(str::to_string)
    }

    fn required(&self, key: &str) -> ParseResult<String> {
        self.owned_attr(key).ok_or_else(|| format!("<{}> is missing attribute `{}`", self.name, key))
    }
}

enum Node {
    Start(Element),
    End(String),
    Text(String),
}

/// Mixed content such as `const <ptype>GLchar</ptype> *<name>label</name>`.
#[derive(Default)]
struct Fragment {
    text: String,
    /// The text seen before the `<name>` child.
    before_name: Option<String>,
    name: Option<String>,
    ptype: Option<String>,
}

fn block_kind(element: &str) -> Option<BlockKind> {
    match element {
        "require" => Some(BlockKind::Require),
        "remove" => Some(BlockKind::Remove),
        _ => None,
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split('|').filter(|s| !s.is_empty()).map(str::to_string).collect()
}

struct Parser<R: io::Read> {
    events: Events<R>,
}

impl<R: io::Read> Parser<R> {
    fn next(&mut self) -> ParseResult<Node> {
        loop {
            let event = match self.events.next() {
                Some(event) => event.map_err(|err| err.to_string())?,
                None => return Err("unexpected end of document".to_string()),
            };

            match event {
                XmlEvent::StartElement { name, attributes, .. } => {
                    return Ok(Node::Start(Element { name: name.local_name, attributes }))
                },
                XmlEvent::EndElement { name } => return Ok(Node::End(name.local_name)),
                XmlEvent::Characters(text) | XmlEvent::Whitespace(text) | XmlEvent::CData(text) => {
                    return Ok(Node::Text(text))
                },
                XmlEvent::EndDocument => return Err("unexpected end of document".to_string()),
                _ => {},
            }
        }
    }

    /// Calls `f` for every child element of `parent` until its end tag. Text is ignored.
    fn children<F>(&mut self, parent: &str, mut f: F) -> ParseResult<()>
    where F: FnMut(&mut Self, Element) -> ParseResult<()> {
        loop {
            match self.next()? {
                Node::Start(el) => f(self, el)?,
                Node::End(ref name) if name == parent => return Ok(()),
                Node::End(name) => return Err(format!("unexpected </{}> in <{}>", name, parent)),
                Node::Text(_) => {},
            }
        }
    }

    fn skip(&mut self, el: &Element) -> ParseResult<()> {
        self.children(&el.name, |p, child| p.skip(&child))
    }

    /// Collects the text up to the current element's end tag, skipping nested elements.
    fn text(&mut self) -> ParseResult<String> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Node::Text(t) => text.push_str(&t),
                Node::Start(el) => self.skip(&el)?,
                Node::End(_) => return Ok(text),
            }
        }
    }

    fn fragment(&mut self) -> ParseResult<Fragment> {
        let mut frag = Fragment::default();
        loop {
            match self.next()? {
                Node::Text(t) => frag.text.push_str(&t),
                Node::Start(el) => match &el.name[..] {
                    "name" => {
                        let name = self.text()?;
                        frag.before_name = Some(frag.text.clone());
                        frag.text.push_str(&name);
                        frag.name = Some(name);
                    },
                    "ptype" => {
                        let ty = self.text()?;
                        frag.text.push_str(&ty);
                        frag.ptype = Some(ty);
                    },
                    "apientry" => {
                        self.skip(&el)?;
                        frag.text.push_str("APIENTRY");
                    },
                    _ => self.skip(&el)?,
                },
                Node::End(_) => return Ok(frag),
            }
        }
    }

    fn registry(&mut self) -> ParseResult<RawRegistry> {
        let mut registry = RawRegistry::default();

        self.children("registry", |p, el| {
            match &el.name[..] {
                "types" => {
                    for ty in p.types()? {
                        registry.type_names.insert(ty.inner.name.clone());
                        registry.types.push(ty);
                    }
                },
                "enums" => registry.enums.extend(p.enums(&el)?),
                "commands" => registry.cmds.extend(p.commands()?),
                "feature" => registry.features.push(p.feature(&el)?),
                "extensions" => registry.extensions.extend(p.extensions()?),
                _ => p.skip(&el)?,
            }
            Ok(())
        })?;

        Ok(registry)
    }

    fn types(&mut self) -> ParseResult<Vec<ApiScoped<RawType>>> {
        let mut types = Vec::new();

        self.children("types", |p, el| {
            if el.name != "type" {
                return p.skip(&el);
            }

            let frag = p.fragment()?;
            let name = el.owned_attr("name").or(frag.name).ok_or_else(|| "<type> without a name".to_string())?;
            types.push(ApiScoped {
                api: el.owned_attr("api"),
                inner: RawType { name, requires: el.owned_attr("requires"), decl: frag.text.trim().to_string() },
            });
            Ok(())
        })?;

        Ok(types)
    }

    fn enums(&mut self, container: &Element) -> ParseResult<Vec<ApiScoped<RawEnum>>> {
        let group = container.owned_attr("group");
        let mut enums = Vec::new();

        self.children("enums", |p, el| {
            if el.name == "enum" {
                enums.push(ApiScoped {
                    api: el.owned_attr("api"),
                    inner: RawEnum {
                        ident: el.required("name")?,
                        value: el.required("value")?,
                        suffix: el.owned_attr("type"),
                        group: el.owned_attr("group").or_else(|| group.clone()),
                    },
                });
            }
            p.skip(&el)
        })?;

        Ok(enums)
    }

    fn commands(&mut self) -> ParseResult<Vec<Cmd>> {
        let mut cmds = Vec::new();

        self.children("commands", |p, el| {
            if el.name == "command" {
                cmds.push(p.command()?);
                Ok(())
            } else {
                p.skip(&el)
            }
        })?;

        Ok(cmds)
    }

    fn command(&mut self) -> ParseResult<Cmd> {
        let mut proto = None;
        let mut params = Vec::new();
        let mut alias = None;

        self.children("command", |p, el| {
            match &el.name[..] {
                "proto" => proto = Some(p.binding(&el)?),
                "param" => params.push(p.binding(&el)?),
                "alias" => {
                    alias = Some(el.required("name")?);
                    p.skip(&el)?;
                },
                _ => p.skip(&el)?,
            }
            Ok(())
        })?;

        let proto = proto.ok_or_else(|| "<command> without <proto>".to_string())?;
        Ok(Cmd { proto, params, alias })
    }

    fn binding(&mut self, el: &Element) -> ParseResult<Binding> {
        let frag = self.fragment()?;
        let ident = frag.name.ok_or_else(|| format!("<{}> without <name>", el.name))?;
        let ty = frag.before_name.unwrap_or_default().split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(Binding { ident, ty, ptype: frag.ptype })
    }

    fn feature(&mut self, el: &Element) -> ParseResult<RawFeature> {
        let api = el.required("api")?;
        let name = el.required("name")?;
        let number = el.required("number")?;
        let blocks = self.blocks(el)?;
        Ok(RawFeature { api, name, number, blocks })
    }

    fn extensions(&mut self) -> ParseResult<Vec<RawExtension>> {
        let mut exts = Vec::new();

        self.children("extensions", |p, el| {
            if el.name != "extension" {
                return p.skip(&el);
            }

            exts.push(RawExtension {
                name: el.required("name")?,
                supported: el.attr("supported").map(split_list).unwrap_or_default(),
                platforms: el.attr("platform").map(split_list),
                blocks: p.blocks(&el)?,
            });
            Ok(())
        })?;

        Ok(exts)
    }

    /// Reads the `<require>` and `<remove>` children of a feature or extension in document
    ///  order.
    fn blocks(&mut self, el: &Element) -> ParseResult<Vec<RawBlock>> {
        let mut blocks = Vec::new();

        self.children(&el.name, |p, child| match block_kind(&child.name) {
            Some(kind) => {
                blocks.push(p.block(kind, &child)?);
                Ok(())
            },
            None => p.skip(&child),
        })?;

        Ok(blocks)
    }

    fn block(&mut self, kind: BlockKind, el: &Element) -> ParseResult<RawBlock> {
        let mut block = RawBlock {
            kind,
            profile: el.owned_attr("profile"),
            api: el.owned_attr("api"),
            types: Vec::new(),
            enums: Vec::new(),
            cmds: Vec::new(),
        };

        self.children(&el.name, |p, child| {
            match &child.name[..] {
                // `struct _cl_event` refers to the type named `_cl_event`
                "type" => block.types.push(child.required("name")?.trim_start_matches("struct ").to_string()),
                "enum" => block.enums.push(child.required("name")?),
                "command" => block.cmds.push(child.required("name")?),
                _ => {},
            }
            p.skip(&child)
        })?;

        Ok(block)
    }
}
