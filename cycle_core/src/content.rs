//! Static phase content.
//!
//! Display copy shown on the dashboard card and in recommendations for each
//! phase. Built once on first use and never mutated.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Cached content table, keyed by phase
static PHASE_CONTENT: Lazy<HashMap<CyclePhase, PhaseInfo>> = Lazy::new(build_phase_content);

fn build_phase_content() -> HashMap<CyclePhase, PhaseInfo> {
    let mut content = HashMap::new();

    content.insert(
        CyclePhase::Menstrual,
        PhaseInfo {
            phase: CyclePhase::Menstrual,
            name: "Menstrual Phase",
            description: "Your period. Hormone levels are at their lowest and energy often dips.",
            message: "Be gentle with yourself. Rest is productive too.",
            workout: "Light movement: walking, restorative yoga, gentle stretching.",
            nutrition: "Iron-rich foods like leafy greens and lentils, plus warming soups and herbal tea.",
            recovery: "Prioritise sleep, use a heat pack for cramps, keep sessions short.",
        },
    );

    content.insert(
        CyclePhase::Follicular,
        PhaseInfo {
            phase: CyclePhase::Follicular,
            name: "Follicular Phase",
            description: "Estrogen rises after your period. Energy and motivation build.",
            message: "Your energy is climbing. A great time to try something new.",
            workout: "Strength training, cardio intervals and new skills.",
            nutrition: "Lean protein, fermented foods and fresh vegetables to fuel training.",
            recovery: "Active recovery between harder sessions, mobility work.",
        },
    );

    content.insert(
        CyclePhase::Ovulation,
        PhaseInfo {
            phase: CyclePhase::Ovulation,
            name: "Ovulation Phase",
            description: "Estrogen peaks and an egg is released. Strength and confidence peak too.",
            message: "You're at your peak. Go for that personal best.",
            workout: "High-intensity intervals, heavy lifts, group classes.",
            nutrition: "Fibre-rich vegetables, whole grains and plenty of water.",
            recovery: "Thorough warm-ups and cool-downs. Joints can be more lax right now.",
        },
    );

    content.insert(
        CyclePhase::Luteal,
        PhaseInfo {
            phase: CyclePhase::Luteal,
            name: "Luteal Phase",
            description: "Progesterone rises. Energy gradually winds down towards your next period.",
            message: "Slow and steady. Listen to your body and adjust as you go.",
            workout: "Moderate strength, pilates, steady-state cardio.",
            nutrition: "Complex carbs, magnesium-rich foods like dark chocolate and nuts.",
            recovery: "Extra sleep, stress management and lower-intensity days as needed.",
        },
    );

    content
}

/// Display copy for a phase
pub fn phase_info(phase: CyclePhase) -> &'static PhaseInfo {
    match PHASE_CONTENT.get(&phase) {
        Some(info) => info,
        None => menstrual_fallback(),
    }
}

/// Display copy for a phase given by name; unknown names get the menstrual
/// entry.
pub fn phase_info_by_name(name: &str) -> &'static PhaseInfo {
    phase_info(CyclePhase::from_name_or_default(name))
}

fn menstrual_fallback() -> &'static PhaseInfo {
    tracing::warn!("Phase content table is missing an entry, using menstrual copy");
    &PHASE_CONTENT[&CyclePhase::Menstrual]
}

/// Check the content table is complete
pub fn validate_content() -> Vec<String> {
    let mut errors = Vec::new();

    for phase in CyclePhase::ALL {
        let Some(info) = PHASE_CONTENT.get(&phase) else {
            errors.push(format!("No content for phase '{}'", phase));
            continue;
        };

        if info.phase != phase {
            errors.push(format!(
                "Content keyed by '{}' describes phase '{}'",
                phase, info.phase
            ));
        }

        let fields = [
            ("name", info.name),
            ("description", info.description),
            ("message", info.message),
            ("workout", info.workout),
            ("nutrition", info.nutrition),
            ("recovery", info.recovery),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                errors.push(format!("Phase '{}' has empty {}", phase, field));
            }
        }
    }

    errors
}
