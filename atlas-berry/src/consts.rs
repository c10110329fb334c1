//! 通用常量.

/// 图谱源目录中的文件名.
pub mod source {
    /// 元信息文件.
    pub const METADATA: &str = "metadata.json";

    /// 结构层级文件.
    pub const STRUCTURES: &str = "structures.json";

    /// 参考图像文件名 (不含扩展名).
    pub const REFERENCE_STEM: &str = "reference";

    /// 标注体文件名 (不含扩展名).
    pub const ANNOTATION_STEM: &str = "annotation";

    /// 体数据支持的扩展名, 按查找优先级排列.
    pub const VOLUME_EXTENSIONS: [&str; 5] = ["npy", "tiff", "tif", "nii", "nii.gz"];

    /// 网格目录.
    pub const MESH_DIR: &str = "meshes";

    /// BrainGlobe 本地缓存目录名, 位于用户主目录下.
    pub const BRAINGLOBE_DIR: &str = ".brainglobe";
}

/// 输出目录 `<data_path>/<atlas_name>/` 中的文件名.
pub mod output {
    /// 图谱元信息.
    pub const META: &str = "meta.json";

    /// 归一化参考图像.
    pub const REFERENCE: &str = "reference.bytes";

    /// 标注体.
    pub const ANNOTATION: &str = "annotation.bytes";

    /// 结构质心表.
    pub const MESH_CENTERS: &str = "mesh_centers.csv";

    /// 结构层级的原样拷贝.
    pub const STRUCTURES: &str = "structures.json";

    /// 网格工作目录.
    pub const MESH_DIR: &str = "meshes";

    /// 记录网格工作目录绝对路径的指针文件.
    pub const MESH_PATH: &str = "mesh_path.txt";

    /// 网格阶段台账.
    pub const STAGES: &str = "stages.json";
}

/// 结构层级的根结构.
pub const ROOT_STRUCTURE: &str = "root";

/// 网格文件扩展名.
pub const MESH_EXT: &str = "obj";

/// 材质文件扩展名.
pub const MATERIAL_EXT: &str = "mtl";

/// 单半球网格的文件名后缀, 插在扩展名之前.
pub const HEMISPHERE_SUFFIX: &str = "L";

/// 平滑强度.
pub const SMOOTH_FACTOR: f64 = 1.0;

/// 平滑迭代次数.
pub const SMOOTH_ITERATIONS: usize = 5;

/// 空结构在质心表中的占位值.
pub const CENTROID_SENTINEL: i32 = -1;

/// 体数据中内外侧 (medial-lateral) 轴的索引.
pub const ML_AXIS: usize = 2;
