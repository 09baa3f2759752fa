use serde::{Deserialize, Serialize};

/// One filesystem entry as the presentation layer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemItem {
    pub key: String,
    pub label: String,
    pub path: String,
    pub name: String,
    pub is_directory: bool,
    /// Bytes. For directories, zero until aggregated.
    pub size: u64,
    /// Epoch milliseconds.
    pub modified: i64,
    pub is_leaf: bool,
}

/// A [`FileSystemItem`] together with whatever part of its subtree was materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemNode {
    #[serde(flatten)]
    pub item: FileSystemItem,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileSystemNode>,
    /// Children were listed. False for files and for directories beyond the requested depth.
    pub expanded: bool,
    /// Something below this node could not be read or the scan was cancelled.
    pub incomplete: bool,
}

impl FileSystemNode {
    pub fn find(&self, name: &str) -> Option<&FileSystemNode> {
        self.children.iter().find(|child| child.item.name == name)
    }

    /// Depth-first visit of this node and every materialized descendant.
    pub fn walk(&self) -> Vec<&FileSystemNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter());
        }
        out
    }
}
