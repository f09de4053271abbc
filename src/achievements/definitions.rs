//! Built-in achievement catalogue.

use super::{AchievementScope, Rarity, RegionalAchievement, RequirementType};
use crate::geo::regions::STATE_REGIONS;
use crate::geo::{MacroRegion, StateCode};

#[allow(clippy::too_many_arguments)]
fn achievement(
    id: String,
    name: String,
    description: String,
    scope: AchievementScope,
    requirement: (RequirementType, u32),
    points_reward: u32,
    icon: &str,
    rarity: Rarity,
) -> RegionalAchievement {
    RegionalAchievement {
        id,
        name,
        description,
        scope,
        requirement_type: requirement.0,
        requirement_value: requirement.1,
        points_reward,
        icon: icon.to_string(),
        rarity,
    }
}

fn slug(region: MacroRegion) -> String {
    region.as_str().to_ascii_lowercase().replace('-', "_")
}

/// Default achievements seeded into a fresh database.
pub fn default_achievements() -> Vec<RegionalAchievement> {
    let mut achievements = vec![
        achievement(
            "top_3_brasil".to_string(),
            "Top 3 Brasil".to_string(),
            "Reach the national top 3".to_string(),
            AchievementScope::Country,
            (RequirementType::Position, 3),
            500,
            "🥇",
            Rarity::Legendary,
        ),
        achievement(
            "top_10_brasil".to_string(),
            "Top 10 Brasil".to_string(),
            "Reach the national top 10".to_string(),
            AchievementScope::Country,
            (RequirementType::Position, 10),
            200,
            "🏆",
            Rarity::Epic,
        ),
        achievement(
            "pontos_1000_brasil".to_string(),
            "Mil Pontos".to_string(),
            "Earn 1000 points".to_string(),
            AchievementScope::Country,
            (RequirementType::Points, 1000),
            50,
            "⭐",
            Rarity::Common,
        ),
    ];

    for region in MacroRegion::ALL {
        achievements.push(achievement(
            format!("lider_{}", slug(region)),
            format!("Líder do {}", region),
            format!("Take first place in the {} ranking", region),
            AchievementScope::Region(region),
            (RequirementType::Position, 1),
            150,
            "👑",
            Rarity::Epic,
        ));
        achievements.push(achievement(
            format!("top_5_{}", slug(region)),
            format!("Top 5 {}", region),
            format!("Reach the top 5 of the {} ranking", region),
            AchievementScope::Region(region),
            (RequirementType::Position, 5),
            75,
            "🗺️",
            Rarity::Rare,
        ));
    }

    for (code, _) in STATE_REGIONS {
        let Some(state) = StateCode::parse(code) else {
            continue;
        };
        achievements.push(achievement(
            format!("lider_{}", code.to_ascii_lowercase()),
            format!("Líder {}", code),
            format!("Take first place in {}", code),
            AchievementScope::State(state),
            (RequirementType::Position, 1),
            100,
            "📍",
            Rarity::Rare,
        ));
    }

    achievements
}
