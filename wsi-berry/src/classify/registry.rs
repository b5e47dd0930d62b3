use super::builtin::{ConstantExtractor, HematoxylinExtractor};
use super::{Classifier, ClassifyError};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// 推理设备选项.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceOptions {
    /// 是否使用加速器 (GPU).
    pub use_accelerator: bool,

    /// 加速器编号.
    pub device_id: u32,
}

/// 分类器工厂. 接受配置文件路径和设备选项.
pub type Factory = fn(&Path, &DeviceOptions) -> Result<Box<dyn Classifier>, ClassifyError>;

/// 以字符串为键的分类器工厂注册表.
#[derive(Clone, Default)]
pub struct ClassifierRegistry {
    factories: BTreeMap<String, Factory>,
}

impl fmt::Debug for ClassifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

impl ClassifierRegistry {
    /// 空注册表.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册了全部内置分类器 (`constant`, `hematoxylin`) 的注册表.
    pub fn with_builtins() -> Self {
        let mut ans = Self::new();
        ans.register("constant", ConstantExtractor::factory);
        ans.register("hematoxylin", HematoxylinExtractor::factory);
        ans
    }

    /// 以 `name` 注册工厂. 同名工厂会被覆盖, 此时返回旧的工厂.
    pub fn register(&mut self, name: impl Into<String>, factory: Factory) -> Option<Factory> {
        self.factories.insert(name.into(), factory)
    }

    /// 按名字升序返回所有已注册的名字.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// 以名字 `name` 和配置文件 `config` 构造分类器.
    pub fn create(
        &self,
        name: &str,
        config: &Path,
        device: &DeviceOptions,
    ) -> Result<Box<dyn Classifier>, ClassifyError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ClassifyError::UnknownExtractor(name.to_owned()))?;
        factory(config, device)
    }
}
