use crate::formula::RowSpec;

/// Table-shape fix applied to the scraped rows before they are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupRule {
    None,
    /// The BedWars table opens with an aggregate row above the real header.
    DropLeadingRow,
}

/// Value scraped from outside the stat table and merged into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraField {
    None,
    /// `<li><b>Level:</b> 1,234</li>` in the panel's info list, stored at `Overall.Level`.
    BadgeLevel,
}

/// Everything that differs between one game/mode table and another.
#[derive(Debug, Clone, Copy)]
pub struct Archetype {
    pub name: &'static str,
    /// Game name as it appears in the panel id (`stat_panel_<category>`).
    pub category: &'static str,
    /// `(formula, label)` pairs in display order.
    pub rows: &'static [(&'static str, &'static str)],
    pub cleanup: CleanupRule,
    pub extra: ExtraField,
}

impl Archetype {
    pub fn panel_id(&self) -> String {
        format!("stat_panel_{}", self.category)
    }

    pub fn row_specs(&self) -> Vec<RowSpec> {
        self.rows
            .iter()
            .map(|(formula, label)| RowSpec::new(*formula, *label))
            .collect()
    }

    /// Hypixel BedWars mode ids. Anything unrecognised gets the overall table.
    pub fn for_mode(mode: Option<&str>) -> &'static Archetype {
        match mode {
            Some("eight_one") => &BEDWARS_SOLO,
            Some("eight_two") => &BEDWARS_DOUBLES,
            Some("four_three") => &BEDWARS_THREES,
            Some("four_four") => &BEDWARS_FOURS,
            _ => &BEDWARS,
        }
    }

    pub fn by_name(name: &str) -> Option<&'static Archetype> {
        ALL.iter()
            .copied()
            .find(|a| a.name.eq_ignore_ascii_case(name.trim()))
    }
}

pub static ALL: &[&Archetype] = &[
    &SKYWARS,
    &BEDWARS,
    &BEDWARS_SOLO,
    &BEDWARS_DOUBLES,
    &BEDWARS_THREES,
    &BEDWARS_FOURS,
];

pub static SKYWARS: Archetype = Archetype {
    name: "skywars",
    category: "SkyWars",
    rows: &[
        ("^Solo Normal.Wins$ + ^Solo Insane.Wins$", "Solo Wins"),
        ("^Team Normal.Wins$ + ^Team Insane.Wins$", "Team Wins"),
    ],
    cleanup: CleanupRule::None,
    extra: ExtraField::None,
};

pub static BEDWARS: Archetype = Archetype {
    name: "bedwars",
    category: "BedWars",
    rows: &[
        ("^Overall.Level$", "Bedwars Level"),
        ("^Solo.Wins$", "Solo Wins"),
        ("^Doubles.Wins$", "Doubles Wins"),
        ("^3v3v3v3.Wins$", "3v3v3v3 Wins"),
        ("^4v4v4v4.Wins$", "4v4v4v4 Wins"),
        ("^4v4.Wins$", "4v4 Wins"),
        ("^Overall.Wins$", "Total Wins"),
        (
            "^Overall.Wins$ / (^Overall.Wins$ + ^Overall.Losses$)",
            "Win Rate",
        ),
        ("^Overall.Kills$", "Kills"),
        ("^Overall.K/D$", "K/D"),
        ("^Overall.Final Kills$", "Final Kills"),
        ("^Overall.Final K/D$", "Final K/D"),
        ("^Overall.Kills$ + ^Overall.Final Kills$", "Total Kills"),
    ],
    cleanup: CleanupRule::DropLeadingRow,
    extra: ExtraField::BadgeLevel,
};

macro_rules! bedwars_mode {
    ($name:literal, $mode:literal) => {
        Archetype {
            name: $name,
            category: "BedWars",
            rows: &[
                (concat!("^", $mode, ".Wins$"), concat!($mode, " Wins")),
                (
                    concat!(
                        "^", $mode, ".Wins$ / (^", $mode, ".Wins$ + ^", $mode, ".Losses$)"
                    ),
                    "Win Rate",
                ),
                (concat!("^", $mode, ".Kills$"), "Kills"),
                (concat!("^", $mode, ".K/D$"), "K/D"),
                (concat!("^", $mode, ".Final Kills$"), "Final Kills"),
                (concat!("^", $mode, ".Final K/D$"), "Final K/D"),
                (
                    concat!("^", $mode, ".Kills$ + ^", $mode, ".Final Kills$"),
                    "Total Kills",
                ),
            ],
            cleanup: CleanupRule::DropLeadingRow,
            extra: ExtraField::BadgeLevel,
        }
    };
}

pub static BEDWARS_SOLO: Archetype = bedwars_mode!("solo", "Solo");
pub static BEDWARS_DOUBLES: Archetype = bedwars_mode!("doubles", "Doubles");
pub static BEDWARS_THREES: Archetype = bedwars_mode!("threes", "3v3v3v3");
pub static BEDWARS_FOURS: Archetype = bedwars_mode!("fours", "4v4v4v4");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_ids_map_to_mode_tables() {
        assert_eq!(Archetype::for_mode(Some("eight_two")).name, "doubles");
        assert_eq!(Archetype::for_mode(Some("four_four")).name, "fours");
        assert_eq!(Archetype::for_mode(Some("nonsense")).name, "bedwars");
        assert_eq!(Archetype::for_mode(None).name, "bedwars");
    }

    #[test]
    fn mode_rows_reference_their_own_sub_mode() {
        let rows = BEDWARS_THREES.row_specs();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].formula, "^3v3v3v3.Wins$");
        assert_eq!(rows[0].label, "3v3v3v3 Wins");
        assert_eq!(
            rows[1].formula,
            "^3v3v3v3.Wins$ / (^3v3v3v3.Wins$ + ^3v3v3v3.Losses$)"
        );
    }

    #[test]
    fn lookup_by_name_ignores_case() {
        assert_eq!(Archetype::by_name("SkyWars").map(|a| a.category), Some("SkyWars"));
        assert!(Archetype::by_name("duels").is_none());
    }
}
