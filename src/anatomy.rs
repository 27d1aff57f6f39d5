//! Supported bones and the landmark vocabulary used to mark them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A bone the engine knows how to analyse.
///
/// Variants are declared in alphabetical order so the derived ordering matches
/// the ordering of bone names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bone {
    /// Lateral bone of the lower leg.
    Fibula,
    /// Lateral bone of the forearm.
    Radius,
    /// Medial bone of the lower leg.
    Tibia,
    /// Medial bone of the forearm.
    Ulna,
}

impl Bone {
    /// Every supported bone, in name order.
    pub const ALL: [Bone; 4] = [Bone::Fibula, Bone::Radius, Bone::Tibia, Bone::Ulna];

    /// Lower-case name used in labels and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Bone::Fibula => "fibula",
            Bone::Radius => "radius",
            Bone::Tibia => "tibia",
            Bone::Ulna => "ulna",
        }
    }

    /// Label of the landmark marking the head of the bone.
    #[must_use]
    pub const fn head_label(self) -> &'static str {
        match self {
            Bone::Fibula => "fibula_head",
            Bone::Radius => "radius_head",
            Bone::Tibia => "tibia_head",
            Bone::Ulna => "ulna_head",
        }
    }

    /// Label of the landmark marking the tail of the bone.
    #[must_use]
    pub const fn tail_label(self) -> &'static str {
        match self {
            Bone::Fibula => "fibula_tail",
            Bone::Radius => "radius_tail",
            Bone::Tibia => "tibia_tail",
            Bone::Ulna => "ulna_tail",
        }
    }

    /// Label for the given end of the bone.
    #[must_use]
    pub const fn label(self, role: Role) -> &'static str {
        match role {
            Role::Head => self.head_label(),
            Role::Tail => self.tail_label(),
        }
    }

    /// The paired bone group this bone belongs to.
    #[must_use]
    pub const fn pair(self) -> BonePair {
        match self {
            Bone::Radius | Bone::Ulna => BonePair::Forearm,
            Bone::Fibula | Bone::Tibia => BonePair::Leg,
        }
    }

    /// Look up a bone by its exact lower-case name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Bone> {
        Bone::ALL.into_iter().find(|bone| bone.name() == name)
    }

    /// Interpret a detector class label such as `"Ulna fracture"` as a bone.
    ///
    /// The normalized label must either equal a bone name or start with the
    /// name followed by an underscore.
    #[must_use]
    pub fn from_detector_label(label: &str) -> Option<Bone> {
        let label = normalize_label(label);
        Bone::ALL.into_iter().find(|bone| {
            label == bone.name()
                || label
                    .strip_prefix(bone.name())
                    .is_some_and(|rest| rest.starts_with('_'))
        })
    }
}

impl fmt::Display for Bone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Group of two bones analysed together on one radiograph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonePair {
    /// Ulna and radius.
    Forearm,
    /// Tibia and fibula.
    Leg,
}

impl BonePair {
    /// The two bones of the pair, medial bone first.
    #[must_use]
    pub const fn bones(self) -> [Bone; 2] {
        match self {
            BonePair::Forearm => [Bone::Ulna, Bone::Radius],
            BonePair::Leg => [Bone::Tibia, Bone::Fibula],
        }
    }
}

/// End of the bone a landmark marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Proximal end, where the fragment angles start.
    Head,
    /// Distal end.
    Tail,
}

/// A parsed landmark label such as `ulna_head`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LandmarkLabel {
    /// Bone the landmark belongs to.
    pub bone: Bone,
    /// End of the bone it marks.
    pub role: Role,
}

impl LandmarkLabel {
    /// Parse a raw label, accepting any casing and spaces in place of underscores.
    ///
    /// # Examples
    /// ```
    /// use fracturex::anatomy::{LandmarkLabel, Role};
    /// use fracturex::Bone;
    ///
    /// let label = LandmarkLabel::parse("Radius Tail").expect("known label");
    /// assert_eq!(label.bone, Bone::Radius);
    /// assert_eq!(label.role, Role::Tail);
    /// assert!(LandmarkLabel::parse("femur_head").is_none());
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let label = normalize_label(raw);
        Bone::ALL.into_iter().find_map(|bone| {
            [Role::Head, Role::Tail]
                .into_iter()
                .find(|role| bone.label(*role) == label)
                .map(|role| LandmarkLabel { bone, role })
        })
    }

    /// Canonical spelling of the label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.bone.label(self.role)
    }
}

/// Canonical form of a user-supplied label: trimmed, lower-case, `_` for spaces.
#[must_use]
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}
