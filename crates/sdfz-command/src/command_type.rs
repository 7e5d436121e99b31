//! Command id enumeration and the parameter shape of each command.
//!
//! Ids follow the engine's built-in `CMD_*` table. Any non-negative id that
//! is not in the table (Lua custom commands, ids added by newer engines)
//! resolves to [`CommandType::Unknown`]. Negative ids are always
//! [`CommandType::Build`].

use std::fmt;

/// Wire layout of a command's parameter array.
///
/// Several command types share a shape: PATROL and SETBASE both carry a
/// single map position, RECLAIM and RESURRECT both accept a unit or an
/// area. The decoder dispatches on the shape, never on the command type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamShape {
    /// No parameters.
    Icon,
    /// REMOVE / INSERT: a queue position followed by a nested command.
    QueueEdit,
    /// Build position and facing.
    Build,
    /// A single integer mode (fire state, on/off, ...).
    Mode,
    /// A map position.
    Map,
    /// A building placement position.
    Building,
    /// A position and a radius.
    Area,
    /// A single target unit.
    Unit,
    /// A unit (1 param) or a position (3 params).
    UnitOrMap,
    /// A position (3 params) or a position and direction (6 params).
    Front,
    /// A unit (1 param) or an area (4 params).
    UnitOrArea,
    /// A unit or feature (1 param) or an area (4 params).
    UnitFeatureOrArea,
    /// A unit (1 param) or a rectangle (6 params).
    UnitOrRectangle,
    /// A single generic numeric argument.
    Number,
    /// No decoder is registered for this command.
    Unregistered,
}

macro_rules! command_types {
    ($($(#[$meta:meta])* $variant:ident = $id:literal, $name:literal, $shape:ident;)*) => {
        /// A command type resolved from a wire command id.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum CommandType {
            /// Build order. Encoded on the wire as a negative id whose
            /// magnitude is a unit definition id.
            Build,
            $($(#[$meta])* $variant,)*
            /// An id outside the built-in table.
            Unknown(i32),
        }

        impl CommandType {
            /// Resolve a wire command id.
            pub fn from_id(id: i32) -> Self {
                if id < 0 {
                    return Self::Build;
                }
                match id {
                    $($id => Self::$variant,)*
                    other => Self::Unknown(other),
                }
            }

            /// The wire id, or `None` for [`CommandType::Build`] whose id
            /// varies with the unit definition.
            pub fn id(self) -> Option<i32> {
                match self {
                    Self::Build => None,
                    $(Self::$variant => Some($id),)*
                    Self::Unknown(id) => Some(id),
                }
            }

            /// Engine name of the command (`"MOVE"`, `"BUILD"`, ...).
            pub fn name(self) -> &'static str {
                match self {
                    Self::Build => "BUILD",
                    $(Self::$variant => $name,)*
                    Self::Unknown(_) => "UNKNOWN",
                }
            }

            /// Parameter shape used to decode this command's payload.
            pub fn shape(self) -> ParamShape {
                match self {
                    Self::Build => ParamShape::Build,
                    $(Self::$variant => ParamShape::$shape,)*
                    Self::Unknown(_) => ParamShape::Unregistered,
                }
            }
        }
    };
}

command_types! {
    /// Stop all current orders.
    Stop = 0, "STOP", Icon;
    /// Insert a command into the queue.
    Insert = 1, "INSERT", QueueEdit;
    /// Remove a command from the queue.
    Remove = 2, "REMOVE", QueueEdit;
    /// Wait until released.
    Wait = 5, "WAIT", Icon;
    /// Wait for a number of seconds.
    TimeWait = 6, "TIMEWAIT", Number;
    /// Wait for a unit (or units in a rectangle) to die.
    DeathWait = 7, "DEATHWAIT", UnitOrRectangle;
    /// Wait for a squad of the given size.
    SquadWait = 8, "SQUADWAIT", Number;
    /// Wait for all selected units to gather.
    GatherWait = 9, "GATHERWAIT", Icon;
    /// Move, optionally in formation.
    Move = 10, "MOVE", Front;
    /// Patrol to a position.
    Patrol = 15, "PATROL", Map;
    /// Attack-move, optionally in formation.
    Fight = 16, "FIGHT", Front;
    /// Attack a unit or ground position.
    Attack = 20, "ATTACK", UnitOrMap;
    /// Attack everything in an area.
    AreaAttack = 21, "AREA_ATTACK", Area;
    /// Guard a unit.
    Guard = 25, "GUARD", Unit;
    /// Hand selected units to an AI.
    AiSelect = 30, "AISELECT", Unregistered;
    /// Select a control group.
    GroupSelect = 35, "GROUPSELECT", Icon;
    /// Add to a control group.
    GroupAdd = 36, "GROUPADD", Icon;
    /// Clear a control group.
    GroupClear = 37, "GROUPCLEAR", Icon;
    /// Repair a unit or everything in an area.
    Repair = 40, "REPAIR", UnitOrArea;
    /// Set the fire state.
    FireState = 45, "FIRE_STATE", Mode;
    /// Set the move state.
    MoveState = 50, "MOVE_STATE", Mode;
    /// Set a factory base position.
    SetBase = 55, "SETBASE", Map;
    /// Engine-internal bookkeeping command.
    Internal = 60, "INTERNAL", Unregistered;
    /// Self destruct.
    SelfDestruct = 65, "SELFD", Icon;
    /// Load a unit or all units in an area.
    LoadUnits = 75, "LOAD_UNITS", UnitOrArea;
    /// Board a transport.
    LoadOnto = 76, "LOAD_ONTO", Unit;
    /// Unload all units in an area.
    UnloadUnits = 80, "UNLOAD_UNITS", Area;
    /// Unload a single unit at a position.
    UnloadUnit = 81, "UNLOAD_UNIT", Building;
    /// Toggle a unit on or off.
    OnOff = 85, "ONOFF", Mode;
    /// Reclaim a unit, feature or area.
    Reclaim = 90, "RECLAIM", UnitFeatureOrArea;
    /// Toggle cloak.
    Cloak = 95, "CLOAK", Mode;
    /// Build a stockpile charge.
    Stockpile = 100, "STOCKPILE", Icon;
    /// Fire the manual weapon at a unit or position.
    ManualFire = 105, "MANUALFIRE", UnitOrMap;
    /// Restore terrain in an area.
    Restore = 110, "RESTORE", Area;
    /// Toggle queue repeat.
    Repeat = 115, "REPEAT", Mode;
    /// Toggle high/low trajectory.
    Trajectory = 120, "TRAJECTORY", Mode;
    /// Resurrect a feature or everything in an area.
    Resurrect = 125, "RESURRECT", UnitFeatureOrArea;
    /// Capture a unit or everything in an area.
    Capture = 130, "CAPTURE", UnitOrArea;
    /// Set the auto-repair level.
    AutoRepairLevel = 135, "AUTOREPAIRLEVEL", Mode;
    /// Set the idle mode (aircraft).
    IdleMode = 145, "IDLEMODE", Mode;
    /// A command the engine failed to execute.
    Failed = 150, "FAILED", Unregistered;
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "UNKNOWN({id})"),
            other => f.write_str(other.name()),
        }
    }
}
