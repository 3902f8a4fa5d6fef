//! DOM Tree (arena-based allocation)
//!
//! Native tree operations. These follow the DOM standard's pre-insertion
//! validity rules: every check runs before the first link is touched, so a
//! failed call leaves the tree exactly as it was.

use crate::{DomError, InternedString, Node, NodeData, NodeId, NodeType, StringInterner};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    interner: StringInterner,
}

impl DomTree {
    /// Create a new tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            interner: StringInterner::new(),
        }
    }

    /// Document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.get(id).ok_or(DomError::InvalidNode(id))
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Access the name interner
    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    /// Resolve an interned name
    pub fn resolve(&self, name: InternedString) -> &str {
        self.interner.get(name)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    // --- Creation ---

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let name = self.interner.intern_name(tag);
        self.alloc(Node::element(name))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(Node::text(content.to_string()))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.alloc(Node::comment(content.to_string()))
    }

    /// Create an empty document fragment
    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(Node::fragment())
    }

    // --- Queries ---

    /// Physical parent
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.get())
    }

    /// First physical child
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.get())
    }

    /// Last physical child
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.last_child.get())
    }

    /// Physical previous sibling
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.get())
    }

    /// Physical next sibling
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.get())
    }

    /// Iterate over the physical children of a node
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id).unwrap_or(NodeId::NONE),
        }
    }

    /// Physical children collected in order
    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).map(|(child, _)| child).collect()
    }

    /// Position of `child` among the children of `parent`
    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).position(|(id, _)| id == child)
    }

    /// DOM node type
    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get(id).map(Node::node_type)
    }

    /// Lowercase tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        let elem = self.get(id)?.as_element()?;
        Some(self.resolve(elem.name))
    }

    /// Whether `ancestor` is `node` or one of its physical ancestors
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node's ancestor chain reaches the document
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root(), id)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Text(t)) => out.push_str(&t.content),
            Some(NodeData::Comment(_)) | None => {}
            Some(_) => {
                for (child, _) in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Outer-HTML-like serialization
    pub fn serialize(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(t) => escape_into(&t.content, out),
            NodeData::Comment(c) => {
                out.push_str("<!--");
                out.push_str(c);
                out.push_str("-->");
            }
            NodeData::Element(elem) => {
                let tag = self.resolve(elem.name);
                out.push('<');
                out.push_str(tag);
                for attr in &elem.attrs {
                    out.push(' ');
                    out.push_str(self.resolve(attr.name));
                    out.push_str("=\"");
                    escape_into(&attr.value, out);
                    out.push('"');
                }
                out.push('>');
                for (child, _) in self.children(id) {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeData::Document | NodeData::DocumentFragment => {
                for (child, _) in self.children(id) {
                    self.write_node(child, out);
                }
            }
        }
    }

    // --- Data ---

    /// Replace the data of a text or comment node
    pub fn set_text(&mut self, id: NodeId, content: &str) -> Result<(), DomError> {
        match self.get_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Text(t)) => {
                t.content = content.to_string();
                Ok(())
            }
            Some(NodeData::Comment(c)) => {
                *c = content.to_string();
                Ok(())
            }
            _ => Err(DomError::InvalidNode(id)),
        }
    }

    /// Set an element attribute
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let name = self.interner.intern_name(name);
        let elem = self
            .get_mut(id)
            .and_then(Node::as_element_mut)
            .ok_or(DomError::InvalidNode(id))?;
        elem.set_attr(name, value.to_string());
        Ok(())
    }

    /// Read an element attribute
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        let name = self.interner.lookup(&name.to_ascii_lowercase())?;
        self.get(id)?.as_element()?.get_attr(name)
    }

    // --- Mutation ---

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end when `None`)
    ///
    /// Inserting a fragment moves its children and leaves it empty.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<NodeId, DomError> {
        self.ensure_pre_insert(parent, child)?;
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotFound { parent, child: reference });
            }
        }

        let mut reference = reference;
        if reference == Some(child) {
            reference = self.next_sibling(child);
        }

        if self.node(child)?.is_fragment() {
            for moved in self.child_ids(child) {
                self.unlink(moved);
                self.link_before(parent, moved, reference);
            }
        } else {
            self.unlink(child);
            self.link_before(parent, child, reference);
        }
        Ok(child)
    }

    /// Remove `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotFound { parent, child });
        }
        self.unlink(child);
        Ok(child)
    }

    /// Replace `old` with `new` under `parent`, returning `old`
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new: NodeId,
        old: NodeId,
    ) -> Result<NodeId, DomError> {
        if self.parent(old) != Some(parent) {
            return Err(DomError::NotFound { parent, child: old });
        }
        self.ensure_pre_insert(parent, new)?;
        if new == old {
            return Ok(old);
        }

        let mut reference = self.next_sibling(old);
        if reference == Some(new) {
            reference = self.next_sibling(new);
        }
        self.unlink(old);
        self.insert_before(parent, new, reference)?;
        Ok(old)
    }

    /// Unlink a node from whatever parent it has (no-op when detached)
    pub fn detach(&mut self, id: NodeId) {
        self.unlink(id);
    }

    fn ensure_pre_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        let parent_ok = matches!(
            parent_node.data,
            NodeData::Document | NodeData::Element(_) | NodeData::DocumentFragment
        );
        if !parent_ok
            || matches!(child_node.data, NodeData::Document)
            || self.contains(child, parent)
        {
            tracing::trace!(%parent, %child, "pre-insert validation failed");
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    fn unlink(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        if !parent.is_valid() {
            return;
        }

        match self.get_mut(prev) {
            Some(p) => p.next_sibling = next,
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first_child = next;
                }
            }
        }
        match self.get_mut(next) {
            Some(n) => n.prev_sibling = prev,
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last_child = prev;
                }
            }
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    fn link_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let prev = match reference {
            Some(r) => self.prev_sibling(r),
            None => self.last_child(parent),
        };
        let next = reference.unwrap_or(NodeId::NONE);

        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
            node.prev_sibling = prev.unwrap_or(NodeId::NONE);
            node.next_sibling = next;
        }
        match prev.and_then(|p| self.get_mut(p)) {
            Some(p) => p.next_sibling = child,
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first_child = child;
                }
            }
        }
        match self.get_mut(next) {
            Some(n) => n.prev_sibling = child,
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last_child = child;
                }
            }
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the physical children of a node
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.get()?;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_before_reference() {
        let mut tree = DomTree::new();
        let ul = tree.create_element("ul");
        let a = tree.create_element("li");
        let b = tree.create_element("li");
        tree.append_child(ul, b).unwrap();
        tree.insert_before(ul, a, Some(b)).unwrap();

        assert_eq!(tree.child_ids(ul), vec![a, b]);
        assert_eq!(tree.prev_sibling(b), Some(a));
        assert_eq!(tree.first_child(ul), Some(a));
        assert_eq!(tree.last_child(ul), Some(b));
    }

    #[test]
    fn test_insert_before_self_is_noop() {
        let mut tree = DomTree::new();
        let ul = tree.create_element("ul");
        let a = tree.create_element("li");
        let b = tree.create_element("li");
        tree.append_child(ul, a).unwrap();
        tree.append_child(ul, b).unwrap();
        tree.insert_before(ul, a, Some(a)).unwrap();
        assert_eq!(tree.child_ids(ul), vec![a, b]);
    }

    #[test]
    fn test_fragment_insertion_empties_fragment() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let frag = tree.create_fragment();
        let t1 = tree.create_text("a");
        let t2 = tree.create_text("b");
        tree.append_child(frag, t1).unwrap();
        tree.append_child(frag, t2).unwrap();

        tree.append_child(div, frag).unwrap();
        assert_eq!(tree.child_ids(div), vec![t1, t2]);
        assert!(tree.first_child(frag).is_none());
        assert_eq!(tree.text_content(div), "ab");
    }

    #[test]
    fn test_hierarchy_request() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("div");
        tree.append_child(outer, inner).unwrap();

        let err = tree.append_child(inner, outer).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest { .. }));
        let text = tree.create_text("x");
        assert!(tree.append_child(text, inner).is_err());
        assert_eq!(tree.parent(inner), Some(outer));
    }

    #[test]
    fn test_remove_child_not_found() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let stray = tree.create_element("span");
        let err = tree.remove_child(div, stray).unwrap_err();
        assert_eq!(err, DomError::NotFound { parent: div, child: stray });
        assert!(err.to_string().contains("not a child of this node"));
    }

    #[test]
    fn test_replace_child_with_next_sibling() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let a = tree.create_text("a");
        let b = tree.create_text("b");
        let c = tree.create_text("c");
        for id in [a, b, c] {
            tree.append_child(div, id).unwrap();
        }
        tree.replace_child(div, b, a).unwrap();
        assert_eq!(tree.child_ids(div), vec![b, c]);
        assert!(tree.parent(a).is_none());
    }

    #[test]
    fn test_serialize() {
        let mut tree = DomTree::new();
        let div = tree.create_element("DIV");
        tree.set_attribute(div, "class", "a&b").unwrap();
        let text = tree.create_text("1 < 2");
        let comment = tree.create_comment("m");
        tree.append_child(div, text).unwrap();
        tree.append_child(div, comment).unwrap();
        assert_eq!(
            tree.serialize(div),
            "<div class=\"a&amp;b\">1 &lt; 2<!--m--></div>"
        );
    }
}
