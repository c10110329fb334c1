//! 编辑场景.
//!
//! 场景使用 Z 轴朝上的右手坐标系, OBJ 文件使用 Y 轴朝上.
//! 导入时 `(x, y, z) -> (x, -z, y)`, 导出时做逆变换.
//! 该变换是旋转, 不改变面的朝向.
//!
//! 导入得到的 [`ScopedObject`] 持有场景的可变借用, 离开作用域时
//! (包括提前返回与 panic) 自动从场景中移除该对象.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, warn};

use super::{obj, ExportOptions, MeshError, SurfaceMesh};
use crate::Vec3;

/// OBJ 坐标 -> 场景坐标.
#[inline]
pub fn obj_to_scene([x, y, z]: Vec3) -> Vec3 {
    [x, -z, y]
}

/// 场景坐标 -> OBJ 坐标.
#[inline]
pub fn scene_to_obj([x, y, z]: Vec3) -> Vec3 {
    [x, z, -y]
}

/// 场景内对象编号.
pub type ObjectId = u64;

#[derive(Debug)]
struct SceneObject {
    name: String,
    mesh: SurfaceMesh,
}

/// 编辑场景. 流程中同一时刻最多只有一个对象.
#[derive(Debug, Default)]
pub struct Scene {
    objects: BTreeMap<ObjectId, SceneObject>,
    next: ObjectId,
}

impl Scene {
    /// 空场景.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 对象个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// 当前所有对象名, 按导入顺序.
    pub fn names(&self) -> Vec<&str> {
        self.objects.values().map(|o| o.name.as_str()).collect()
    }

    /// 导入 OBJ 文件. 对象名为文件名 (不含扩展名).
    ///
    /// 读取失败时场景保持不变.
    pub fn import<P: AsRef<Path>>(&mut self, path: P) -> Result<ScopedObject<'_>, MeshError> {
        let path = path.as_ref();
        let mut mesh = obj::load(path)?;
        mesh.map_positions(obj_to_scene);
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.insert(name, mesh))
    }

    /// 将场景坐标下的网格加入场景.
    pub fn insert<S: Into<String>>(&mut self, name: S, mesh: SurfaceMesh) -> ScopedObject<'_> {
        let id = self.next;
        self.next += 1;
        let name = name.into();
        debug!("scene: + #{id} `{name}`");
        self.objects.insert(id, SceneObject { name, mesh });
        ScopedObject { scene: self, id }
    }

    /// 移除所有残留对象, 返回移除的个数. 流水线在每个阶段结束时调用.
    pub fn clear(&mut self) -> usize {
        let n = self.objects.len();
        if n > 0 {
            warn!("scene: clearing leftover object(s) {:?}", self.names());
        }
        self.objects.clear();
        n
    }
}

/// 场景中的一个对象. 离开作用域时从场景移除.
#[derive(Debug)]
pub struct ScopedObject<'s> {
    scene: &'s mut Scene,
    id: ObjectId,
}

impl<'s> ScopedObject<'s> {
    fn object(&self) -> &SceneObject {
        // `self` 存活期间, 场景不可能被其他人修改.
        &self.scene.objects[&self.id]
    }

    /// 对象编号.
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// 对象名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.object().name
    }

    /// 场景坐标下的网格.
    #[inline]
    pub fn mesh(&self) -> &SurfaceMesh {
        &self.object().mesh
    }

    /// 可变网格.
    pub fn mesh_mut(&mut self) -> &mut SurfaceMesh {
        let id = self.id;
        match self.scene.objects.get_mut(&id) {
            Some(o) => &mut o.mesh,
            None => unreachable!("scoped object #{id} vanished from the scene"),
        }
    }

    /// 以 OBJ 坐标写出网格, 覆盖已有文件.
    pub fn export<P: AsRef<Path>>(&self, path: P, options: &ExportOptions) -> Result<(), MeshError> {
        let mut mesh = self.mesh().clone();
        mesh.map_positions(scene_to_obj);
        obj::save(&mesh, self.name(), path, options)
    }
}

impl Drop for ScopedObject<'_> {
    fn drop(&mut self) {
        if self.scene.objects.remove(&self.id).is_some() {
            debug!("scene: - #{}", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes::cube;
    use std::fs;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn test_axis_conversion_is_inverse() {
        let p = [1.0, 2.0, 3.0];
        assert_eq!(obj_to_scene(p), [1.0, -3.0, 2.0]);
        assert_eq!(scene_to_obj(obj_to_scene(p)), p);
    }

    #[test]
    fn test_scope_removes_object() {
        let mut scene = Scene::new();
        {
            let mut obj = scene.insert("a", cube([0.0; 3], 1.0));
            obj.mesh_mut().triangulate();
            assert_eq!(obj.name(), "a");
            assert!(obj.mesh().is_triangulated());
        }
        assert!(scene.is_empty());

        // panic 时同样移除.
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _obj = scene.insert("b", cube([0.0; 3], 1.0));
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(scene.is_empty());
        assert_eq!(scene.clear(), 0);
    }

    #[test]
    fn test_clear_leftovers() {
        let mut scene = Scene::new();
        // 不经过 `Drop` 的对象会残留在场景中.
        let leaked = scene.insert("leaked", cube([0.0; 3], 1.0));
        assert_eq!(leaked.id(), 0);
        std::mem::forget(leaked);
        assert_eq!(scene.names(), vec!["leaked"]);

        assert_eq!(scene.clear(), 1);
        assert!(scene.is_empty());
        assert_eq!(scene.insert("next", cube([0.0; 3], 1.0)).id(), 1);
    }

    #[test]
    fn test_failed_import_leaves_scene_empty() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.obj");
        fs::write(&bad, "v 0 0 0\n").unwrap();

        let mut scene = Scene::new();
        assert!(scene.import(&bad).is_err());
        assert!(scene.is_empty());

        fn early_return(scene: &mut Scene, path: &Path) -> Result<(), MeshError> {
            let _obj = scene.import(path)?;
            Err(MeshError::Empty(path.to_owned()))
        }
        let good = dir.path().join("good.obj");
        obj::save(&cube([0.0; 3], 1.0), "good", &good, &ExportOptions::default()).unwrap();
        assert!(early_return(&mut scene, &good).is_err());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_import_export_preserves_obj_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("7.obj");
        let mesh = cube([1.0, 2.0, 3.0], 1.0);
        obj::save(&mesh, "7", &path, &ExportOptions::default()).unwrap();

        let mut scene = Scene::new();
        let out = dir.path().join("7-copy.obj");
        {
            let obj = scene.import(&path).unwrap();
            assert_eq!(obj.name(), "7");
            // OBJ 的 y 轴变为场景的 z 轴.
            let (lo, hi) = obj.mesh().bounds().unwrap();
            assert_eq!(lo, [1.0, -4.0, 2.0]);
            assert_eq!(hi, [2.0, -3.0, 3.0]);
            assert!(obj.mesh().signed_volume() > 0.0);
            obj.export(&out, &ExportOptions::default()).unwrap();
        }
        assert!(scene.is_empty());

        let back = obj::load(&out).unwrap();
        assert_eq!(back.bounds(), mesh.bounds());
    }
}
