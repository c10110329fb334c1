use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, WithPath};

/// 结构层级中的一个结构.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    /// 唯一缩写, 例如 `root`, `CH`.
    pub acronym: String,

    /// 唯一整数 id, 与标注体中的体素值对应.
    pub id: u32,

    /// 全称.
    #[serde(default)]
    pub name: String,

    /// 从根结构到自身的 id 路径 (包含自身).
    #[serde(default)]
    pub structure_id_path: Vec<u32>,

    /// 显示颜色.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_triplet: Option<[u8; 3]>,
}

impl Structure {
    /// 父结构 id. `structure_id_path` 的倒数第二项.
    #[inline]
    pub fn parent_id(&self) -> Option<u32> {
        let n = self.structure_id_path.len();
        (n >= 2).then(|| self.structure_id_path[n - 2])
    }
}

/// 结构层级. 由 `structure_id_path` 重建出的树 (或森林).
#[derive(Debug, Clone)]
pub struct StructureTree {
    nodes: Vec<Structure>,
    by_acronym: HashMap<String, usize>,
    by_id: HashMap<u32, usize>,

    /// 每个结构的子结构, 按缩写排序.
    children: Vec<Vec<usize>>,
}

impl StructureTree {
    /// 从 `structures.json` 读取.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AtlasError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_path(path)?;
        let nodes = serde_json::from_str(&text).map_err(|source| AtlasError::Json {
            path: path.to_owned(),
            source,
        })?;
        Self::new(nodes)
    }

    /// 从结构列表构建层级. 缩写或 id 重复, 或父子关系成环时返回 `Err`.
    ///
    /// 父结构不存在的结构被视为一棵新树的根.
    pub fn new(nodes: Vec<Structure>) -> Result<Self, AtlasError> {
        let mut by_acronym = HashMap::with_capacity(nodes.len());
        let mut by_id = HashMap::with_capacity(nodes.len());
        for (i, s) in nodes.iter().enumerate() {
            if by_acronym.insert(s.acronym.clone(), i).is_some() || by_id.insert(s.id, i).is_some()
            {
                return Err(AtlasError::DuplicateStructure(s.acronym.clone()));
            }
        }

        let mut parents = vec![None; nodes.len()];
        for (i, s) in nodes.iter().enumerate() {
            let Some(parent) = s.parent_id() else {
                continue;
            };
            match by_id.get(&parent) {
                Some(&p) => parents[i] = Some(p),
                None => warn!(
                    "structure `{}` refers to missing parent {parent}, treating it as a root",
                    s.acronym
                ),
            }
        }

        // 沿父指针向上, 超过结构个数仍未到根即说明成环.
        for (i, s) in nodes.iter().enumerate() {
            let mut cur = parents[i];
            let mut steps = 0;
            while let Some(p) = cur {
                steps += 1;
                if p == i || steps > nodes.len() {
                    return Err(AtlasError::CyclicHierarchy(s.acronym.clone()));
                }
                cur = parents[p];
            }
        }

        let mut children = vec![Vec::new(); nodes.len()];
        for (i, parent) in parents.into_iter().enumerate() {
            if let Some(p) = parent {
                children[p].push(i);
            }
        }
        for c in children.iter_mut() {
            c.sort_by(|&a, &b| nodes[a].acronym.cmp(&nodes[b].acronym));
        }

        Ok(Self {
            nodes,
            by_acronym,
            by_id,
            children,
        })
    }

    /// 结构个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 按文件中的顺序迭代所有结构.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Structure> {
        self.nodes.iter()
    }

    /// 按缩写查找.
    #[inline]
    pub fn get(&self, acronym: &str) -> Option<&Structure> {
        self.by_acronym.get(acronym).map(|&i| &self.nodes[i])
    }

    /// 按 id 查找.
    #[inline]
    pub fn by_id(&self, id: u32) -> Option<&Structure> {
        self.by_id.get(&id).map(|&i| &self.nodes[i])
    }

    /// 获取 `acronym` 的全部后代结构 (不含自身).
    ///
    /// 顺序为深度优先先序遍历, 同一父结构下的子结构按缩写升序.
    pub fn descendants(&self, acronym: &str) -> Result<Vec<&Structure>, AtlasError> {
        let &start = self
            .by_acronym
            .get(acronym)
            .ok_or_else(|| AtlasError::UnknownStructure(acronym.to_owned()))?;

        let mut ans = Vec::new();
        let mut stack: Vec<usize> = self.children[start].iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            ans.push(&self.nodes[i]);
            stack.extend(self.children[i].iter().rev());
        }
        Ok(ans)
    }
}
