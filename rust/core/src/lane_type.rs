// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lane type codes.

/// Lane type as stored in map files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LaneType {
    #[default]
    None,
    Driving,
    Stop,
    Shoulder,
    Biking,
    Sidewalk,
    Border,
    Restricted,
    Parking,
    Bidirectional,
    ConnectingRamp,
    Curb,
    Entry,
    Exit,
    Median,
    Offramp,
    Onramp,
    Rail,
    RoadWorks,
    Tram,
}

impl LaneType {
    /// Map a file code to a lane type. Unknown codes map to `None`.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => LaneType::Driving,
            2 => LaneType::Stop,
            3 => LaneType::Shoulder,
            4 => LaneType::Biking,
            5 => LaneType::Sidewalk,
            6 => LaneType::Border,
            7 => LaneType::Restricted,
            8 => LaneType::Parking,
            27 => LaneType::Bidirectional,
            29 => LaneType::ConnectingRamp,
            30 => LaneType::Curb,
            31 => LaneType::Entry,
            32 => LaneType::Exit,
            33 => LaneType::Median,
            34 => LaneType::Offramp,
            35 => LaneType::Onramp,
            36 => LaneType::Rail,
            37 => LaneType::RoadWorks,
            39 => LaneType::Tram,
            _ => LaneType::None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            LaneType::None => 0,
            LaneType::Driving => 1,
            LaneType::Stop => 2,
            LaneType::Shoulder => 3,
            LaneType::Biking => 4,
            LaneType::Sidewalk => 5,
            LaneType::Border => 6,
            LaneType::Restricted => 7,
            LaneType::Parking => 8,
            LaneType::Bidirectional => 27,
            LaneType::ConnectingRamp => 29,
            LaneType::Curb => 30,
            LaneType::Entry => 31,
            LaneType::Exit => 32,
            LaneType::Median => 33,
            LaneType::Offramp => 34,
            LaneType::Onramp => 35,
            LaneType::Rail => 36,
            LaneType::RoadWorks => 37,
            LaneType::Tram => 39,
        }
    }

    /// Friction coefficient used when a lane record carries none.
    pub fn default_friction(self) -> f64 {
        match self {
            LaneType::Shoulder
            | LaneType::Border
            | LaneType::Curb
            | LaneType::Median
            | LaneType::Rail
            | LaneType::RoadWorks
            | LaneType::Tram => 1.0,
            _ => 0.8,
        }
    }

    /// Whether vehicles drive on this lane.
    pub fn is_drivable(self) -> bool {
        matches!(
            self,
            LaneType::Driving
                | LaneType::Bidirectional
                | LaneType::ConnectingRamp
                | LaneType::Entry
                | LaneType::Exit
                | LaneType::Offramp
                | LaneType::Onramp
        )
    }
}
