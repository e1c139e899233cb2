//! Small DOM toolkit over `markup5ever_rcdom`.
//!
//! The transform renames tags, rewrites attributes, and splices subtrees
//! between documents, so it needs a mutable tree. These helpers wrap the
//! rcdom `Handle` plumbing (parent pointers, RefCell children) behind
//! ordinary functions.

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever::{Attribute, LocalName, QualName, namespace_url, ns};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

use lawsite_shared::{LawsiteError, Result};

// ---------------------------------------------------------------------------
// Parse / serialize
// ---------------------------------------------------------------------------

/// Parse bytes as a full HTML document and return the document node.
pub fn parse_html(bytes: &[u8]) -> Result<Handle> {
    let dom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut &bytes[..])
        .map_err(|e| LawsiteError::parse(format!("html parse failed: {e}")))?;
    Ok(dom.document)
}

/// Serialize a document node (children only, so the doctype and root
/// element come out at top level) to UTF-8 bytes.
pub fn serialize_document(document: &Handle) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let handle: SerializableHandle = document.clone().into();
    serialize(&mut out, &handle, SerializeOpts::default())
        .map_err(|e| LawsiteError::parse(format!("serialize failed: {e}")))?;
    Ok(out)
}

/// Serialize a single node including itself. Used by tests to inspect
/// individual fragments.
pub fn serialize_node(node: &Handle) -> Result<String> {
    let mut out = Vec::new();
    let handle: SerializableHandle = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    serialize(&mut out, &handle, opts)
        .map_err(|e| LawsiteError::parse(format!("serialize failed: {e}")))?;
    String::from_utf8(out).map_err(|e| LawsiteError::parse(e.to_string()))
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

/// The element's local tag name, if this node is an element.
pub fn tag_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// Whether this node is an element with the given local tag name.
pub fn is_element(node: &Handle, tag: &str) -> bool {
    tag_name(node) == Some(tag)
}

/// Get an attribute value by local name.
pub fn get_attr(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| attr.name.local.as_ref() == name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Set (or add) an attribute by local name.
pub fn set_attr(node: &Handle, name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        if let Some(attr) = attrs
            .iter_mut()
            .find(|attr| attr.name.local.as_ref() == name)
        {
            attr.value = value.into();
        } else {
            attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(name)),
                value: value.into(),
            });
        }
    }
}

/// Concatenated text content of the subtree, element boundaries ignored.
pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

/// Whether a node is a text node consisting only of whitespace.
pub fn is_whitespace_text(node: &Handle) -> bool {
    match &node.data {
        NodeData::Text { contents } => contents.borrow().trim().is_empty(),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// All descendant nodes in document order (pre-order), excluding `root`.
pub fn descendants(root: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    walk(root, &mut out);
    out
}

fn walk(node: &Handle, out: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        out.push(child.clone());
        walk(child, out);
    }
}

/// First descendant element matching the predicate, in document order.
pub fn find_first<F>(root: &Handle, pred: F) -> Option<Handle>
where
    F: Fn(&Handle) -> bool,
{
    descendants(root).into_iter().find(|n| pred(n))
}

/// All descendant elements matching the predicate, in document order.
pub fn find_all<F>(root: &Handle, pred: F) -> Vec<Handle>
where
    F: Fn(&Handle) -> bool,
{
    descendants(root).into_iter().filter(|n| pred(n)).collect()
}

/// The node's parent element, if it is still attached.
pub fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    node.parent.set(weak.clone());
    weak.and_then(|w| w.upgrade())
}

/// The node's following sibling, if any.
pub fn next_sibling(node: &Handle) -> Option<Handle> {
    let parent = parent_of(node)?;
    let children = parent.children.borrow();
    let idx = position_of(&children, node)?;
    children.get(idx + 1).cloned()
}

fn position_of(children: &[Handle], node: &Handle) -> Option<usize> {
    children.iter().position(|c| Rc::ptr_eq(c, node))
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

/// Create a new element in the HTML namespace with the given attributes.
pub fn new_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let attrs = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: (*value).into(),
        })
        .collect();
    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// Create a new text node.
pub fn new_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(text.into()),
    })
}

/// Append a child, fixing its parent pointer. Detaches it first if needed.
pub fn append_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

/// Remove a node from its parent, if attached.
pub fn detach(node: &Handle) {
    if let Some(parent) = parent_of(node) {
        let mut children = parent.children.borrow_mut();
        if let Some(idx) = position_of(&children, node) {
            children.remove(idx);
        }
    }
    node.parent.set(None);
}

/// Insert `new` as the sibling immediately after `node`.
/// Detaches `new` from any previous parent first.
pub fn insert_after(node: &Handle, new: &Handle) {
    let Some(parent) = parent_of(node) else {
        return;
    };
    detach(new);
    let mut children = parent.children.borrow_mut();
    if let Some(idx) = position_of(&children, node) {
        children.insert(idx + 1, new.clone());
        new.parent.set(Some(Rc::downgrade(&parent)));
    }
}

/// Drop all children of a node.
pub fn clear_children(node: &Handle) {
    for child in node.children.borrow().iter() {
        child.parent.set(None);
    }
    node.children.borrow_mut().clear();
}

/// Replace a text node's contents (or a childless element's text by
/// clearing it and appending a fresh text node).
pub fn set_text(node: &Handle, text: &str) {
    match &node.data {
        NodeData::Text { contents } => {
            *contents.borrow_mut() = text.into();
        }
        _ => {
            clear_children(node);
            append_child(node, &new_text(text));
        }
    }
}

/// Rename an element in place by swapping in a rebuilt node carrying the
/// same attributes and children. Returns the replacement handle.
///
/// rcdom element names are immutable, so a rename is a node replacement;
/// callers holding the old handle must use the returned one.
pub fn rename_element(node: &Handle, new_tag: &str) -> Handle {
    let NodeData::Element { attrs, .. } = &node.data else {
        return node.clone();
    };

    let renamed = Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(new_tag)),
        attrs: RefCell::new(attrs.borrow().clone()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    });

    // Move children over, re-pointing them at the replacement.
    let moved: Vec<Handle> = node.children.borrow_mut().drain(..).collect();
    for child in &moved {
        child.parent.set(Some(Rc::downgrade(&renamed)));
    }
    *renamed.children.borrow_mut() = moved;

    // Swap in the parent's child list.
    if let Some(parent) = parent_of(node) {
        let mut children = parent.children.borrow_mut();
        if let Some(idx) = position_of(&children, node) {
            children[idx] = renamed.clone();
            renamed.parent.set(Some(Rc::downgrade(&parent)));
        }
    }
    node.parent.set(None);

    renamed
}

/// Recursively clone a subtree. The clone is detached.
pub fn deep_clone(node: &Handle) -> Handle {
    let data = match &node.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            template_contents,
            mathml_annotation_xml_integration_point,
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(
                template_contents.borrow().as_ref().map(deep_clone),
            ),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    };

    let clone = Node::new(data);
    for child in node.children.borrow().iter() {
        append_child(&clone, &deep_clone(child));
    }
    clone
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
