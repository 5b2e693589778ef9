use std::collections::HashMap;

use domain::{Parameter, Threshold, ThresholdScope};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ThresholdKey {
    scope: ThresholdScope,
    scope_id: String,
    parameter: String,
}

impl ThresholdKey {
    fn new(scope: ThresholdScope, scope_id: &str, parameter: &str) -> Self {
        Self {
            scope,
            scope_id: scope_id.to_string(),
            parameter: parameter.to_string(),
        }
    }
}

/// 阈值快照：整体构建、整体替换，构建后只读。
#[derive(Debug, Clone, Default)]
pub struct ThresholdSnapshot {
    entries: HashMap<ThresholdKey, Threshold>,
}

impl ThresholdSnapshot {
    /// 同一键重复时后者覆盖前者。缺少 `scope_id` 的非全局阈值被忽略。
    pub fn build(thresholds: Vec<Threshold>) -> Self {
        let mut entries = HashMap::with_capacity(thresholds.len());
        for threshold in thresholds {
            let scope_id = match (threshold.scope, threshold.scope_id.as_deref()) {
                (ThresholdScope::Global, _) => String::new(),
                (_, Some(id)) if !id.is_empty() => id.to_string(),
                _ => {
                    tracing::warn!(
                        target: "ems.threshold",
                        parameter = %threshold.parameter,
                        scope = threshold.scope.as_str(),
                        "threshold without scope id ignored"
                    );
                    continue;
                }
            };
            let key = ThresholdKey {
                scope: threshold.scope,
                scope_id,
                parameter: threshold.parameter.clone(),
            };
            entries.insert(key, threshold);
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按 设备 → 区域 → 全局 顺序查找，每级先精确参数名再分相族名，首个命中即返回。
    pub fn resolve(
        &self,
        equipment_id: &str,
        area_id: Option<&str>,
        parameter: Parameter,
    ) -> Option<&Threshold> {
        let names: Vec<&str> = std::iter::once(parameter.as_str())
            .chain(parameter.family())
            .collect();

        let mut scopes = vec![(ThresholdScope::Equipment, equipment_id)];
        if let Some(area_id) = area_id {
            scopes.push((ThresholdScope::Area, area_id));
        }
        scopes.push((ThresholdScope::Global, ""));

        scopes.into_iter().find_map(|(scope, scope_id)| {
            names
                .iter()
                .find_map(|name| self.entries.get(&ThresholdKey::new(scope, scope_id, name)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equipment_beats_area_beats_global() {
        let snapshot = ThresholdSnapshot::build(vec![
            Threshold::global("active_power").with_max(None, Some(2000.0)),
            Threshold::for_area("a-1", "active_power").with_max(None, Some(1500.0)),
            Threshold::for_equipment("eq-1", "active_power").with_max(None, Some(1000.0)),
        ]);

        let hit = snapshot
            .resolve("eq-1", Some("a-1"), Parameter::ActivePower)
            .unwrap();
        assert_eq!(hit.critical_max, Some(1000.0));

        let hit = snapshot
            .resolve("eq-2", Some("a-1"), Parameter::ActivePower)
            .unwrap();
        assert_eq!(hit.critical_max, Some(1500.0));

        let hit = snapshot.resolve("eq-2", None, Parameter::ActivePower).unwrap();
        assert_eq!(hit.critical_max, Some(2000.0));
    }

    #[test]
    fn family_name_applies_to_each_phase() {
        let snapshot = ThresholdSnapshot::build(vec![
            Threshold::global("voltage_l2").with_min(Some(210.0), None),
            Threshold::for_area("a-1", "voltage").with_min(Some(200.0), None),
        ]);

        let l1 = snapshot.resolve("eq-1", Some("a-1"), Parameter::VoltageL1).unwrap();
        assert_eq!(l1.warning_min, Some(200.0));

        // 更具体的作用域优先于更精确的参数名
        let l2 = snapshot.resolve("eq-1", Some("a-1"), Parameter::VoltageL2).unwrap();
        assert_eq!(l2.warning_min, Some(200.0));

        assert!(snapshot.resolve("eq-1", None, Parameter::VoltageL1).is_none());
    }

    #[test]
    fn scoped_threshold_without_id_is_dropped() {
        let mut orphan = Threshold::global("frequency");
        orphan.scope = ThresholdScope::Area;
        let snapshot = ThresholdSnapshot::build(vec![orphan]);
        assert!(snapshot.is_empty());
    }
}
