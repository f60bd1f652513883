use crate::world::*;

/// Scores a candidate target for an attacker. `None` means the attacker cannot
/// or should not engage it.
pub trait TargetWeighting: Send + Sync {
    fn weight(&self, attacker: &AgentInfo, target: &AgentInfo) -> Option<f32>;
}

/// Prefers armed units over unarmed ones, then higher firepower, then closer targets.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTargetWeighting;

impl DefaultTargetWeighting {
    const COMBATANT_BONUS: f32 = 100.0;
    const STRUCTURE_PENALTY: f32 = 25.0;
}

impl TargetWeighting for DefaultTargetWeighting {
    fn weight(&self, attacker: &AgentInfo, target: &AgentInfo) -> Option<f32> {
        if !can_engage(attacker, target) {
            return None;
        }

        let mut weight = 0.0;

        if target.has(AgentFlags::COMBATANT) && target.firepower > 0.0 {
            weight += Self::COMBATANT_BONUS;
        }

        if target.has(AgentFlags::STRUCTURE) {
            weight -= Self::STRUCTURE_PENALTY;
        }

        weight += target.firepower;
        weight -= attacker.position.distance_to(target.position);

        Some(weight)
    }
}

/// Whether the attacker's weapons can hit the target's movement domain.
pub fn can_engage(attacker: &AgentInfo, target: &AgentInfo) -> bool {
    let target_is_air = target.has(AgentFlags::AIR) && !target.has(AgentFlags::STRUCTURE);

    if target_is_air {
        attacker.has(AgentFlags::TARGETS_AIR)
    } else {
        attacker.has(AgentFlags::TARGETS_GROUND)
    }
}

/// Longest range the attacker can reach, deployed or not.
pub fn engagement_range(attacker: &AgentInfo) -> f32 {
    attacker
        .deployed_weapon_range
        .map(|deployed| deployed.max(attacker.weapon_range))
        .unwrap_or(attacker.weapon_range)
}

/// Highest weighted candidate; ties resolve to the lowest id.
pub fn select_target<'a, W>(attacker: &AgentInfo, candidates: &'a [AgentInfo], weighting: &W) -> Option<&'a AgentInfo>
where
    W: TargetWeighting + ?Sized,
{
    let mut best: Option<(&AgentInfo, f32)> = None;

    for candidate in candidates {
        if let Some(weight) = weighting.weight(attacker, candidate) {
            let better = match best {
                Some((current, current_weight)) => weight > current_weight || (weight == current_weight && candidate.id < current.id),
                None => true,
            };

            if better {
                best = Some((candidate, weight));
            }
        }
    }

    best.map(|(target, _)| target)
}

/// Order the micro policy wants for a single attacker this evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MicroOrder {
    pub kind: OrderKind,
    pub target: OrderTarget,
}

impl MicroOrder {
    pub fn new(kind: OrderKind, target: OrderTarget) -> MicroOrder {
        MicroOrder { kind, target }
    }
}

/// Per-unit engagement policy.
///
/// Deployable units with a separate deployed weapon deploy once the target is in
/// deployed range (or right after firing) and pack up when it leaves. Structures
/// and disguised units are only committed to inside weapon range plus
/// `engage_margin`; until then the attacker closes distance with a plain move.
pub fn micro_order(attacker: &AgentInfo, target: &AgentInfo, engage_margin: f32) -> MicroOrder {
    let distance = attacker.position.distance_to(target.position);
    let just_fired = attacker.has(AgentFlags::JUST_FIRED);
    let close_range = attacker.weapon_range + engage_margin;
    let within_close_range = !target.requires_close_engagement() || distance <= close_range;

    let attack = MicroOrder::new(OrderKind::Attack, OrderTarget::Agent(target.id));

    if attacker.has(AgentFlags::DEPLOYABLE) {
        if let Some(deployed_range) = attacker.deployed_weapon_range {
            if attacker.has(AgentFlags::DEPLOYED) {
                if distance > deployed_range && !just_fired {
                    return MicroOrder::new(OrderKind::Undeploy, OrderTarget::None);
                }

                return attack;
            }

            if (distance <= deployed_range && within_close_range) || just_fired {
                return MicroOrder::new(OrderKind::Deploy, OrderTarget::None);
            }
        }
    }

    if !within_close_range {
        return MicroOrder::new(OrderKind::Move, OrderTarget::Point(target.position));
    }

    attack
}
