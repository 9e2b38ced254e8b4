//! 粒子定义与引用解析
//!
//! 定义文件分两阶段加载：
//!
//! 1. 解析为按名称索引的 [`RawDefinition`] 表（子规则中的引用仍是字符串）
//! 2. [`DefinitionSet::resolve`] 将所有引用替换为共享的 [`Arc<ParticleDefinition>`]，
//!    名称缺失、空候选列表或循环引用都会使整个加载失败
//!
//! 解析后的 [`ParticleDefinition`] 中不存在字符串引用，实例化阶段不会遇到未解析的子定义。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::range::{Range, VectorRange};
use crate::core::error::{DefinitionError, DefinitionResult};

// ============================================================================
// 解析后的定义
// ============================================================================

/// 不可变的粒子模板
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleDefinition {
    /// 顶层定义的名称，内联定义为 `None`
    pub name: Option<String>,
    /// 三个颜色通道（RGB 0–255，或 `hsv` 为真时的 H/S/V）
    pub color: [Range; 3],
    pub hsv: bool,
    /// 尺寸，缺省为 1
    pub size: Option<Range>,
    /// 初速度，缺省为零向量
    pub velocity: Option<VectorRange>,
    /// 按单位球面上的随机方向逐分量缩放初速度
    pub random_velocity: bool,
    /// 叠加父粒子的当前速度
    pub inherit_velocity: bool,
    /// 寿命（秒），0 表示不会因寿命耗尽而死亡
    pub lifespan: Range,
    /// 全局重力的倍数，缺省为 1
    pub gravity: Option<Range>,
    /// 出现前预先模拟的时长（秒），只推进位置和速度
    pub pre_simulate: Option<f32>,
    /// 死亡时按声明顺序生成子粒子的规则
    pub children: Vec<ChildRule>,
}

impl ParticleDefinition {
    /// 创建白色、静止、给定寿命的定义
    pub fn new(lifespan: impl Into<Range>) -> Self {
        Self {
            name: None,
            color: [Range::Fixed(255.0); 3],
            hsv: false,
            size: None,
            velocity: None,
            random_velocity: false,
            inherit_velocity: false,
            lifespan: lifespan.into(),
            gravity: None,
            pre_simulate: None,
            children: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 设置 RGB 颜色
    pub fn with_rgb(mut self, r: impl Into<Range>, g: impl Into<Range>, b: impl Into<Range>) -> Self {
        self.color = [r.into(), g.into(), b.into()];
        self.hsv = false;
        self
    }

    /// 设置 HSV 颜色
    pub fn with_hsv(mut self, h: impl Into<Range>, s: impl Into<Range>, v: impl Into<Range>) -> Self {
        self.color = [h.into(), s.into(), v.into()];
        self.hsv = true;
        self
    }

    pub fn with_size(mut self, size: impl Into<Range>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_velocity(mut self, velocity: impl Into<VectorRange>) -> Self {
        self.velocity = Some(velocity.into());
        self
    }

    pub fn with_random_velocity(mut self, enabled: bool) -> Self {
        self.random_velocity = enabled;
        self
    }

    pub fn with_inherit_velocity(mut self, enabled: bool) -> Self {
        self.inherit_velocity = enabled;
        self
    }

    pub fn with_gravity(mut self, factor: impl Into<Range>) -> Self {
        self.gravity = Some(factor.into());
        self
    }

    pub fn with_pre_simulate(mut self, seconds: f32) -> Self {
        self.pre_simulate = Some(seconds);
        self
    }

    pub fn with_child(mut self, rule: ChildRule) -> Self {
        self.children.push(rule);
        self
    }

    /// 日志中使用的名称
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<inline>")
    }
}

/// 子粒子生成规则
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRule {
    /// 候选定义，每个实例从中均匀随机挑选一个；保证非空
    pub alternatives: Vec<Arc<ParticleDefinition>>,
    /// 实例数量，取整采样，缺省为 1
    pub count: Option<Range>,
}

impl ChildRule {
    pub fn new(definition: Arc<ParticleDefinition>) -> Self {
        Self {
            alternatives: vec![definition],
            count: None,
        }
    }

    /// 从多个候选中随机挑选；空列表返回 `None`
    pub fn one_of(alternatives: Vec<Arc<ParticleDefinition>>) -> Option<Self> {
        if alternatives.is_empty() {
            return None;
        }
        Some(Self {
            alternatives,
            count: None,
        })
    }

    pub fn with_count(mut self, count: impl Into<Range>) -> Self {
        self.count = Some(count.into());
        self
    }
}

// ============================================================================
// 原始（未解析）定义
// ============================================================================

/// 定义文件中的一条定义，子规则中的引用尚未解析
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDefinition {
    pub color: [Range; 3],
    #[serde(default)]
    pub hsv: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<VectorRange>,
    #[serde(default, alias = "random_velocity")]
    pub random_velocity: bool,
    #[serde(default, alias = "inherit_velocity")]
    pub inherit_velocity: bool,
    pub lifespan: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gravity: Option<Range>,
    #[serde(default, alias = "pre_simulate", skip_serializing_if = "Option::is_none")]
    pub pre_simulate: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawChildRule>,
}

/// 未解析的子规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChildRule {
    pub def: ChildRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Range>,
}

/// 子定义引用：名称、内联定义，或二者组成的候选列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildRef {
    Named(String),
    Inline(Box<RawDefinition>),
    Alternatives(Vec<ChildRef>),
}

/// 按名称索引的原始定义表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionSet {
    entries: BTreeMap<String, RawDefinition>,
}

impl DefinitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML字符串解析
    pub fn from_toml_str(content: &str) -> DefinitionResult<Self> {
        toml::from_str(content).map_err(|e| DefinitionError::Parse(e.to_string()))
    }

    /// 从JSON字符串解析
    pub fn from_json_str(content: &str) -> DefinitionResult<Self> {
        serde_json::from_str(content).map_err(|e| DefinitionError::Parse(e.to_string()))
    }

    /// 按扩展名（`.toml` / `.json`）加载定义文件
    pub fn from_file<P: AsRef<Path>>(path: P) -> DefinitionResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let set = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content)?,
            Some("json") => Self::from_json_str(&content)?,
            other => {
                return Err(DefinitionError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };
        tracing::debug!(target: "definitions", "Parsed {} definitions from {:?}", set.len(), path);
        Ok(set)
    }

    pub fn insert(&mut self, name: impl Into<String>, definition: RawDefinition) {
        self.entries.insert(name.into(), definition);
    }

    /// 合并另一张表，同名定义以 `other` 为准
    pub fn merge(&mut self, other: DefinitionSet) {
        for (name, definition) in other.entries {
            if self.entries.insert(name.clone(), definition).is_some() {
                tracing::warn!(target: "definitions", "Definition '{}' overridden while merging", name);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&RawDefinition> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 解析全部引用
    pub fn resolve(&self) -> DefinitionResult<DefinitionLibrary> {
        let mut resolver = Resolver {
            table: &self.entries,
            resolved: HashMap::with_capacity(self.entries.len()),
            stack: Vec::new(),
        };
        for name in self.entries.keys() {
            resolver.resolve_named(name, name)?;
        }
        tracing::info!(target: "definitions", "Resolved {} particle definitions", resolver.resolved.len());
        Ok(DefinitionLibrary {
            definitions: resolver.resolved,
        })
    }
}

/// 深度优先解析器，`stack` 记录当前解析路径用于检测循环
struct Resolver<'a> {
    table: &'a BTreeMap<String, RawDefinition>,
    resolved: HashMap<String, Arc<ParticleDefinition>>,
    stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn resolve_named(
        &mut self,
        name: &str,
        referenced_by: &str,
    ) -> DefinitionResult<Arc<ParticleDefinition>> {
        if let Some(definition) = self.resolved.get(name) {
            return Ok(Arc::clone(definition));
        }

        if let Some(start) = self.stack.iter().position(|entry| entry == name) {
            let mut chain = self.stack[start..].to_vec();
            chain.push(name.to_string());
            return Err(DefinitionError::CyclicReference { chain });
        }

        let table = self.table;
        let raw = table
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownReference {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })?;

        self.stack.push(name.to_string());
        let mut definition = self.build(raw, name)?;
        self.stack.pop();

        definition.name = Some(name.to_string());
        let definition = Arc::new(definition);
        self.resolved
            .insert(name.to_string(), Arc::clone(&definition));
        Ok(definition)
    }

    fn build(&mut self, raw: &RawDefinition, label: &str) -> DefinitionResult<ParticleDefinition> {
        validate(raw, label)?;

        let mut children = Vec::with_capacity(raw.children.len());
        for rule in &raw.children {
            let mut alternatives = Vec::new();
            self.resolve_ref(&rule.def, label, &mut alternatives)?;
            if alternatives.is_empty() {
                return Err(DefinitionError::EmptyAlternatives {
                    definition: label.to_string(),
                });
            }
            children.push(ChildRule {
                alternatives,
                count: rule.count,
            });
        }

        Ok(ParticleDefinition {
            name: None,
            color: raw.color,
            hsv: raw.hsv,
            size: raw.size,
            velocity: raw.velocity,
            random_velocity: raw.random_velocity,
            inherit_velocity: raw.inherit_velocity,
            lifespan: raw.lifespan,
            gravity: raw.gravity,
            pre_simulate: raw.pre_simulate,
            children,
        })
    }

    fn resolve_ref(
        &mut self,
        reference: &ChildRef,
        owner: &str,
        out: &mut Vec<Arc<ParticleDefinition>>,
    ) -> DefinitionResult<()> {
        match reference {
            ChildRef::Named(name) => out.push(self.resolve_named(name, owner)?),
            ChildRef::Inline(raw) => {
                let label = format!("{}/<inline>", owner);
                out.push(Arc::new(self.build(raw, &label)?));
            }
            ChildRef::Alternatives(list) => {
                for item in list {
                    self.resolve_ref(item, owner, out)?;
                }
            }
        }
        Ok(())
    }
}

fn validate(raw: &RawDefinition, label: &str) -> DefinitionResult<()> {
    let invalid = |field: &'static str, reason: &str| DefinitionError::InvalidValue {
        definition: label.to_string(),
        field,
        reason: reason.to_string(),
    };

    if !raw.color.iter().all(Range::is_finite) {
        return Err(invalid("color", "must be finite"));
    }
    if !raw.lifespan.is_finite() {
        return Err(invalid("lifespan", "must be finite"));
    }
    let (lo, hi) = raw.lifespan.bounds();
    if lo < 0.0 || hi < 0.0 {
        return Err(invalid("lifespan", "must not be negative"));
    }
    if raw.size.map_or(false, |r| !r.is_finite()) {
        return Err(invalid("size", "must be finite"));
    }
    if raw.velocity.map_or(false, |v| !v.is_finite()) {
        return Err(invalid("velocity", "must be finite"));
    }
    if raw.gravity.map_or(false, |r| !r.is_finite()) {
        return Err(invalid("gravity", "must be finite"));
    }
    if let Some(seconds) = raw.pre_simulate {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(invalid("preSimulate", "must be finite and non-negative"));
        }
    }
    for rule in &raw.children {
        if rule.count.map_or(false, |r| !r.is_finite()) {
            return Err(invalid("count", "must be finite"));
        }
    }
    Ok(())
}

// ============================================================================
// 定义库
// ============================================================================

/// 解析完成的定义库，按名称共享同一个 `Arc`
#[derive(Debug, Clone, Default)]
pub struct DefinitionLibrary {
    definitions: HashMap<String, Arc<ParticleDefinition>>,
}

impl DefinitionLibrary {
    /// 加载并解析定义文件
    pub fn load<P: AsRef<Path>>(path: P) -> DefinitionResult<Self> {
        DefinitionSet::from_file(path)?.resolve()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ParticleDefinition>> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// 所有定义名称（已排序）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// 合并另一个已解析的库，同名定义以 `other` 为准
    pub fn merge(&mut self, other: DefinitionLibrary) {
        self.definitions.extend(other.definitions);
    }
}
