//! 粒子系统
//!
//! 活动粒子保存在代际槽位表（`slotmap`）中，用 `prev`/`next` 键串成双向链表，
//! 系统只持有表头。插入和删除都是重新链接，不移动其他粒子。
//!
//! 死亡粒子生成的子粒子链总是拼接到表头，位于当前遍历游标之前，
//! 因此同一次 [`ParticleSystem::simulate`] 不会再访问它们，下一个 tick 才会更新。

use glam::Vec3;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use slotmap::{new_key_type, SlotMap};
use std::sync::Arc;

use super::definition::ParticleDefinition;
use super::particle::{DeathPlan, Particle, Renderable, TickOutcome};
use crate::config::SimulationConfig;
use crate::core::error::{SimulationError, SimulationResult};

new_key_type! {
    /// 活动粒子的代际句柄
    pub struct ParticleKey;
}

/// 尚未插入系统的有序粒子链，第一个元素成为链头
#[derive(Debug, Default)]
pub struct ParticleChain {
    particles: Vec<Particle>,
}

impl ParticleChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(particle: Particle) -> Self {
        Self {
            particles: vec![particle],
        }
    }

    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }
}

impl FromIterator<Particle> for ParticleChain {
    fn from_iter<I: IntoIterator<Item = Particle>>(iter: I) -> Self {
        Self {
            particles: iter.into_iter().collect(),
        }
    }
}

/// 单个 tick 的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// 本 tick 调用 `simulate` 的粒子数
    pub updated: usize,
    /// 本 tick 死亡并移出链表的粒子数
    pub died: usize,
    /// 死亡回调插入的子粒子数
    pub spawned: usize,
}

/// 粒子系统
pub struct ParticleSystem {
    particles: SlotMap<ParticleKey, Particle>,
    head: Option<ParticleKey>,
    rng: StdRng,
    tick_duration: f32,
    default_gravity: f32,
    max_particles: usize,
}

impl ParticleSystem {
    /// 按配置创建；设置了 `seed` 时随机序列可复现
    pub fn new(config: &SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    /// 使用外部提供的随机数生成器
    pub fn with_rng(config: &SimulationConfig, rng: StdRng) -> Self {
        Self {
            particles: SlotMap::with_key(),
            head: None,
            rng,
            tick_duration: config.tick_duration,
            default_gravity: config.default_gravity,
            max_particles: config.max_particles,
        }
    }

    pub fn tick_duration(&self) -> f32 {
        self.tick_duration
    }

    pub fn default_gravity(&self) -> f32 {
        self.default_gravity
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn head(&self) -> Option<ParticleKey> {
        self.head
    }

    pub fn get(&self, key: ParticleKey) -> Option<&Particle> {
        self.particles.get(key)
    }

    pub fn get_mut(&mut self, key: ParticleKey) -> Option<&mut Particle> {
        self.particles.get_mut(key)
    }

    /// 移除所有粒子，不触发死亡逻辑
    pub fn clear(&mut self) {
        self.particles.clear();
        self.head = None;
    }

    /// 将整条链拼接到表头之前
    ///
    /// 只遍历新链本身：链尾接到旧表头，旧表头的 `prev` 指向链尾，表头指向链头。
    /// 超过 `max_particles` 的部分被丢弃。返回实际插入的数量。
    pub fn add_particle(&mut self, chain: ParticleChain) -> usize {
        let mut first: Option<ParticleKey> = None;
        let mut tail: Option<ParticleKey> = None;
        let mut inserted = 0usize;
        let mut dropped = 0usize;

        for mut particle in chain.particles {
            if self.max_particles != 0 && self.particles.len() >= self.max_particles {
                dropped += 1;
                continue;
            }
            particle.prev = tail;
            particle.next = None;
            let key = self.particles.insert(particle);
            match tail {
                Some(prev) => self.particles[prev].next = Some(key),
                None => first = Some(key),
            }
            tail = Some(key);
            inserted += 1;
        }

        if dropped > 0 {
            tracing::warn!(
                target: "particles",
                "Particle cap {} reached, dropped {} particles",
                self.max_particles,
                dropped
            );
        }

        let (Some(first), Some(tail)) = (first, tail) else {
            return 0;
        };

        self.particles[tail].next = self.head;
        if let Some(old_head) = self.head {
            self.particles[old_head].prev = Some(tail);
        }
        self.head = Some(first);

        inserted
    }

    /// 实例化一个定义并插入系统
    pub fn spawn(&mut self, definition: &Arc<ParticleDefinition>, position: Vec3) -> Option<ParticleKey> {
        let particle = Particle::from_definition(self, definition, position, None);
        tracing::debug!(
            target: "particles",
            "Spawning '{}' at {:?}",
            definition.label(),
            position
        );
        if self.add_particle(ParticleChain::single(particle)) == 1 {
            self.head
        } else {
            None
        }
    }

    /// 推进一个 tick
    ///
    /// 从表头到表尾对每个粒子恰好调用一次 `simulate`。先记录 `next` 再处理死亡，
    /// 所以移除当前节点后游标仍然正确。`delta` 非法时不修改任何状态。
    pub fn simulate(&mut self, delta: f32) -> SimulationResult<TickStats> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(SimulationError::InvalidDelta(delta));
        }

        let mut stats = TickStats::default();
        let mut cursor = self.head;

        while let Some(key) = cursor {
            let Some(particle) = self.particles.get_mut(key) else {
                tracing::error!(target: "particles", "Dangling particle link {:?}, stopping traversal", key);
                break;
            };
            cursor = particle.next;
            stats.updated += 1;

            if let TickOutcome::Died { first_death } = particle.simulate(delta) {
                self.unlink(key);
                let Some(mut dead) = self.particles.remove(key) else {
                    continue;
                };
                stats.died += 1;
                if first_death {
                    if let Some(plan) = dead.take_death_plan() {
                        stats.spawned += self.spawn_children(&dead, plan);
                    }
                }
            }
        }

        tracing::trace!(
            target: "particles",
            "Tick: updated={} died={} spawned={} alive={}",
            stats.updated,
            stats.died,
            stats.spawned,
            self.particles.len()
        );
        Ok(stats)
    }

    /// 从链表中摘除节点，两侧邻居可以不存在
    fn unlink(&mut self, key: ParticleKey) {
        let (prev, next) = match self.particles.get_mut(key) {
            Some(particle) => (particle.prev.take(), particle.next.take()),
            None => return,
        };

        match prev {
            Some(prev) => {
                if let Some(p) = self.particles.get_mut(prev) {
                    p.next = next;
                }
            }
            None => {
                if self.head == Some(key) {
                    self.head = next;
                }
            }
        }
        if let Some(next) = next {
            if let Some(n) = self.particles.get_mut(next) {
                n.prev = prev;
            }
        }
    }

    /// 解释死亡计划：按规则声明顺序生成子粒子，整条链一次性插入
    ///
    /// 有上限时只构造剩余容量内的子粒子。
    fn spawn_children(&mut self, parent: &Particle, plan: DeathPlan) -> usize {
        let mut chain = ParticleChain::new();
        let capacity = match self.max_particles {
            0 => usize::MAX,
            max => max.saturating_sub(self.particles.len()),
        };

        'rules: for (rule, &count) in plan.definition.children.iter().zip(&plan.counts) {
            for _ in 0..count {
                if chain.len() >= capacity {
                    break 'rules;
                }
                let picked = match rule.alternatives.as_slice() {
                    [only] => Some(Arc::clone(only)),
                    many => many.choose(&mut self.rng).cloned(),
                };
                let Some(definition) = picked else {
                    continue;
                };
                let child = Particle::from_definition(self, &definition, parent.position, Some(parent));
                chain.push(child);
            }
        }

        let skipped = plan.total().saturating_sub(chain.len());
        if skipped > 0 {
            tracing::warn!(
                target: "particles",
                "Particle cap {} reached, skipped {} children of '{}'",
                self.max_particles,
                skipped,
                plan.definition.label()
            );
        }
        if chain.is_empty() {
            return 0;
        }
        tracing::debug!(
            target: "particles",
            "'{}' died at {:?}, spawning {} children",
            plan.definition.label(),
            parent.position,
            chain.len()
        );
        self.add_particle(chain)
    }

    /// 从表头开始的惰性遍历，每次调用都重新开始
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            particles: &self.particles,
            cursor: self.head,
        }
    }

    /// 当前存活粒子的可渲染快照
    pub fn snapshot(&self) -> Vec<Renderable> {
        self.iter().map(Particle::to_renderable).collect()
    }
}

impl std::fmt::Debug for ParticleSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleSystem")
            .field("alive", &self.particles.len())
            .field("head", &self.head)
            .field("tick_duration", &self.tick_duration)
            .field("default_gravity", &self.default_gravity)
            .field("max_particles", &self.max_particles)
            .finish()
    }
}

/// 活动链表迭代器
pub struct Iter<'a> {
    particles: &'a SlotMap<ParticleKey, Particle>,
    cursor: Option<ParticleKey>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Particle;

    fn next(&mut self) -> Option<Self::Item> {
        let particle = self.particles.get(self.cursor?)?;
        self.cursor = particle.next;
        Some(particle)
    }
}

impl<'a> IntoIterator for &'a ParticleSystem {
    type Item = &'a Particle;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
