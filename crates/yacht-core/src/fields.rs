//! Correspondence table between extractor sections and local record fields.
//!
//! Every row is `(section, extractor field, local field, De Valk label)`. The
//! local record stores one value per row, in table order, followed by the
//! form-only fields. Adding a field to the extractor means adding a row here;
//! the schema tests in this crate fail if a destination is duplicated.

use crate::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub section: Section,
    pub source: &'static str,
    pub dest: &'static str,
    /// Row label as printed on the brokerage listing page.
    pub label: &'static str,
}

const fn field(
    section: Section,
    source: &'static str,
    dest: &'static str,
    label: &'static str,
) -> FieldMapping {
    FieldMapping {
        section,
        source,
        dest,
        label,
    }
}

use crate::Section::{
    Accommodation as Acc, Equipment as Eqp, GeneralInfo as Gen, IndicationRatios as Ratio,
    KeyDetails as Key, Machinery as Mach, Navigation as Nav, Rigging as Rig,
};

pub const FIELD_MAPPINGS: &[FieldMapping] = &[
    // keyDetails
    field(Key, "dimensions", "dimensions", "Dimensions"),
    field(Key, "material", "material", "Material"),
    field(Key, "built", "built", "Built"),
    field(Key, "engines", "engines", "Engine(s)"),
    field(Key, "hpKw", "hpKw", "HP/KW"),
    field(Key, "lying", "lying", "Lying"),
    field(Key, "salesOffice", "salesOffice", "Sales office"),
    field(Key, "status", "status", "Status"),
    field(Key, "vat", "vat", "VAT"),
    field(Key, "askingPrice", "askingPrice", "Asking price"),
    // generalInfo
    field(Gen, "model", "model", "Model"),
    field(Gen, "type", "yachtType", "Type"),
    field(Gen, "loaM", "loaM", "LOA (m)"),
    field(Gen, "lwlM", "lwlM", "LWL (m)"),
    field(Gen, "beamM", "beamM", "Beam (m)"),
    field(Gen, "draftM", "draftM", "Draft (m)"),
    field(Gen, "airDraftM", "airDraftM", "Air draft (m)"),
    field(Gen, "headroomM", "headroomM", "Headroom (m)"),
    field(Gen, "yearBuilt", "yearBuilt", "Year built"),
    field(Gen, "builder", "builder", "Builder"),
    field(Gen, "country", "country", "Country"),
    field(Gen, "designer", "designer", "Designer"),
    field(Gen, "displacementT", "displacementT", "Displacement (t)"),
    field(Gen, "ballastTonnes", "ballastTonnes", "Ballast (tonnes)"),
    field(Gen, "hullMaterial", "hullMaterial", "Hull material"),
    field(Gen, "hullColour", "hullColour", "Hull colour"),
    field(Gen, "hullShape", "hullShape", "Hull shape"),
    field(Gen, "keelType", "keelType", "Keel type"),
    field(Gen, "superstructureMaterial", "superstructureMaterial", "Superstructure material"),
    field(Gen, "deckMaterial", "deckMaterial", "Deck material"),
    field(Gen, "deckFinish", "deckFinish", "Deck finish"),
    field(Gen, "superstructureDeckFinish", "superstructureDeckFinish", "Superstructure deck finish"),
    field(Gen, "cockpitDeckFinish", "cockpitDeckFinish", "Cockpit deck finish"),
    // accommodation
    field(Acc, "cabins", "cabins", "Cabins"),
    field(Acc, "berths", "berths", "Berths"),
    field(Acc, "interior", "interior", "Interior"),
    field(Acc, "layout", "layout", "Layout"),
    field(Acc, "floor", "floor", "Floor"),
    field(Acc, "openCockpit", "openCockpit", "Open cockpit"),
    field(Acc, "aftDeck", "aftDeck", "Aft deck"),
    field(Acc, "saloon", "saloon", "Saloon"),
    field(Acc, "headroomSalonM", "headroomSalonM", "Headroom salon (m)"),
    field(Acc, "heating", "heating", "Heating"),
    field(Acc, "navigationCenter", "navigationCenter", "Navigation center"),
    field(Acc, "chartTable", "chartTable", "Chart table"),
    field(Acc, "galley", "galley", "Galley"),
    field(Acc, "countertop", "countertop", "Countertop"),
    field(Acc, "sink", "sink", "Sink"),
    field(Acc, "cooker", "cooker", "Cooker"),
    field(Acc, "oven", "oven", "Oven"),
    field(Acc, "microwave", "microwave", "Microwave"),
    field(Acc, "fridge", "fridge", "Fridge"),
    field(Acc, "freezer", "freezer", "Freezer"),
    field(Acc, "hotWaterSystem", "hotWaterSystem", "Hot water system"),
    field(Acc, "waterPressureSystem", "waterPressureSystem", "Water pressure system"),
    field(Acc, "ownersCabin", "ownersCabin", "Owners cabin"),
    field(Acc, "bedLength", "bedLength", "Bed length"),
    field(Acc, "wardrobe", "wardrobe", "Wardrobe"),
    field(Acc, "bathroom", "bathroom", "Bathroom"),
    field(Acc, "toilet", "toilet", "Toilet"),
    field(Acc, "toiletSystem", "toiletSystem", "Toilet system"),
    field(Acc, "washBasin", "washBasin", "Wash basin"),
    field(Acc, "shower", "shower", "Shower"),
    field(Acc, "guestCabin1", "guestCabin1", "Guest cabin 1"),
    field(Acc, "guestCabin2", "guestCabin2", "Guest cabin 2"),
    field(Acc, "washingMachine", "washingMachine", "Washing machine"),
    // machinery
    field(Mach, "noOfEngines", "noOfEngines", "No. of engines"),
    field(Mach, "make", "make", "Make"),
    field(Mach, "type", "type", "Type"),
    field(Mach, "hp", "hp", "HP"),
    field(Mach, "kw", "kw", "KW"),
    field(Mach, "fuel", "fuel", "Fuel"),
    field(Mach, "yearInstalled", "yearInstalled", "Year installed"),
    field(Mach, "yearOfOverhaul", "yearOfOverhaul", "Year of overhaul"),
    field(Mach, "maximumSpeedKn", "maximumSpeedKn", "Maximum speed (kn)"),
    field(Mach, "cruisingSpeedKn", "cruisingSpeedKn", "Cruising speed (kn)"),
    field(Mach, "consumptionLhr", "consumptionLhr", "Consumption (L/hr)"),
    field(Mach, "engineCoolingSystem", "engineCoolingSystem", "Engine cooling system"),
    field(Mach, "drive", "drive", "Drive"),
    field(Mach, "shaftSeal", "shaftSeal", "Shaft seal"),
    field(Mach, "engineControls", "engineControls", "Engine controls"),
    field(Mach, "gearbox", "gearbox", "Gearbox"),
    field(Mach, "bowthruster", "bowthruster", "Bowthruster"),
    field(Mach, "propellerType", "propellerType", "Propeller type"),
    field(Mach, "manualBilgePump", "manualBilgePump", "Manual bilge pump"),
    field(Mach, "electricBilgePump", "electricBilgePump", "Electric bilge pump"),
    field(Mach, "electricalInstallation", "electricalInstallation", "Electrical installation"),
    field(Mach, "generator", "generator", "Generator"),
    field(Mach, "batteries", "batteries", "Batteries"),
    field(Mach, "startBattery", "startBattery", "Start battery"),
    field(Mach, "serviceBattery", "serviceBattery", "Service battery"),
    field(Mach, "batteryMonitor", "batteryMonitor", "Battery monitor"),
    field(Mach, "batteryCharger", "batteryCharger", "Battery charger"),
    field(Mach, "solarPanel", "solarPanel", "Solar panel"),
    field(Mach, "shorepower", "shorepower", "Shorepower"),
    field(Mach, "watermaker", "watermaker", "Watermaker"),
    // navigation
    field(Nav, "compass", "compass", "Compass"),
    field(Nav, "electricCompass", "electricCompass", "Electric compass"),
    field(Nav, "depthSounder", "depthSounder", "Depth sounder"),
    field(Nav, "log", "log", "Log"),
    field(Nav, "windset", "windset", "Windset"),
    field(Nav, "repeater", "repeater", "Repeater"),
    field(Nav, "vhf", "vhf", "VHF"),
    field(Nav, "vhfHandheld", "vhfHandheld", "VHF handheld"),
    field(Nav, "autopilot", "autopilot", "Autopilot"),
    field(Nav, "rudderAngleIndicator", "rudderAngleIndicator", "Rudder angle indicator"),
    field(Nav, "radar", "radar", "Radar"),
    field(Nav, "plotterGps", "plotterGps", "Plotter/GPS"),
    field(Nav, "electronicCharts", "electronicCharts", "Electronic charts"),
    field(Nav, "aisTransceiver", "aisTransceiver", "AIS transceiver"),
    field(Nav, "epirb", "epirb", "EPIRB"),
    field(Nav, "navigationLights", "navigationLights", "Navigation lights"),
    // equipment
    field(Eqp, "anchor", "anchor", "Anchor"),
    field(Eqp, "anchorChain", "anchorChain", "Anchor chain"),
    field(Eqp, "anchor2", "anchor2", "Anchor 2"),
    field(Eqp, "windlass", "windlass", "Windlass"),
    field(Eqp, "deckWash", "deckWash", "Deck wash"),
    field(Eqp, "dinghy", "dinghy", "Dinghy"),
    field(Eqp, "outboard", "outboard", "Outboard"),
    field(Eqp, "davits", "davits", "Davits"),
    field(Eqp, "seaRailing", "seaRailing", "Sea railing"),
    field(Eqp, "pushpit", "pushpit", "Pushpit"),
    field(Eqp, "pulpit", "pulpit", "Pulpit"),
    field(Eqp, "lifebuoy", "lifebuoy", "Lifebuoy"),
    field(Eqp, "radarReflector", "radarReflector", "Radar reflector"),
    field(Eqp, "fenders", "fenders", "Fenders"),
    field(Eqp, "mooringLines", "mooringLines", "Mooring lines"),
    field(Eqp, "radio", "radio", "Radio"),
    field(Eqp, "cockpitSpeakers", "cockpitSpeakers", "Cockpit speakers"),
    field(Eqp, "speakersInSalon", "speakersInSalon", "Speakers in salon"),
    field(Eqp, "fireExtinguisher", "fireExtinguisher", "Fire extinguisher"),
    field(Eqp, "fixedWindscreen", "fixedWindscreen", "Fixed windscreen"),
    field(Eqp, "cockpitTable", "cockpitTable", "Cockpit table"),
    field(Eqp, "bathingPlatform", "bathingPlatform", "Bathing platform"),
    field(Eqp, "boardingLadder", "boardingLadder", "Boarding ladder"),
    field(Eqp, "deckShower", "deckShower", "Deck shower"),
    // rigging
    field(Rig, "rigging", "rigging", "Rigging"),
    field(Rig, "standingRigging", "standingRigging", "Standing rigging"),
    field(Rig, "brandMast", "brandMast", "Brand mast"),
    field(Rig, "materialMast", "materialMast", "Material mast"),
    field(Rig, "spreaders", "spreaders", "Spreaders"),
    field(Rig, "mainsail", "mainsail", "Mainsail"),
    field(Rig, "stowayMast", "stowayMast", "Stoway mast"),
    field(Rig, "cutterstay", "cutterstay", "Cutterstay"),
    field(Rig, "jib", "jib", "Jib"),
    field(Rig, "genoa", "genoa", "Genoa"),
    field(Rig, "genoaFurler", "genoaFurler", "Genoa furler"),
    field(Rig, "cutterFurler", "cutterFurler", "Cutter furler"),
    field(Rig, "gennaker", "gennaker", "Gennaker"),
    field(Rig, "spinnaker", "spinnaker", "Spinnaker"),
    field(Rig, "reefingSystem", "reefingSystem", "Reefing system"),
    field(Rig, "backstayAdjuster", "backstayAdjuster", "Backstay adjuster"),
    field(Rig, "primarySheetWinch", "primarySheetWinch", "Primary sheet winch"),
    field(Rig, "secondarySheetWinch", "secondarySheetWinch", "Secondary sheet winch"),
    field(Rig, "genoaSheetwinches", "genoaSheetwinches", "Genoa sheetwinches"),
    field(Rig, "halyardWinches", "halyardWinches", "Halyard winches"),
    field(Rig, "multifunctionalWinches", "multifunctionalWinches", "Multifunctional winches"),
    field(Rig, "spiPole", "spiPole", "Spi-pole"),
    // indicationRatios
    field(Ratio, "saDispl", "saDispl", "SA/Displ."),
    field(Ratio, "balDispl", "balDispl", "Bal./Displ."),
    field(Ratio, "dispLen", "dispLen", "Disp./Len."),
    field(Ratio, "comfortRatio", "comfortRatio", "Comfort ratio"),
    field(Ratio, "capsizeScreeningFormula", "capsizeScreeningFormula", "Capsize screening formula"),
    field(Ratio, "s", "s", "S#"),
    field(Ratio, "hullSpeed", "hullSpeed", "Hull speed"),
    field(Ratio, "poundsInchImmersion", "poundsInchImmersion", "Pounds/inch immersion"),
];

/// Local fields edited by hand that no extractor section feeds.
pub const FORM_ONLY_FIELDS: &[&str] = &["notes", "tags"];

pub const FIELD_COUNT: usize = FIELD_MAPPINGS.len() + FORM_ONLY_FIELDS.len();

/// Fields a record needs before it is minimally usable as a listing.
pub const CORE_FIELDS: &[&str] = &["model", "builder", "yearBuilt", "loaM"];

/// Name of the local field stored at `index` of a record.
pub fn field_name(index: usize) -> Option<&'static str> {
    match FIELD_MAPPINGS.get(index) {
        Some(mapping) => Some(mapping.dest),
        None => FORM_ONLY_FIELDS.get(index - FIELD_MAPPINGS.len()).copied(),
    }
}

pub fn field_index(name: &str) -> Option<usize> {
    FIELD_MAPPINGS
        .iter()
        .position(|m| m.dest == name)
        .or_else(|| {
            FORM_ONLY_FIELDS
                .iter()
                .position(|f| *f == name)
                .map(|i| FIELD_MAPPINGS.len() + i)
        })
}

pub fn local_field_names() -> impl Iterator<Item = &'static str> {
    FIELD_MAPPINGS
        .iter()
        .map(|m| m.dest)
        .chain(FORM_ONLY_FIELDS.iter().copied())
}

pub fn mappings_for(section: Section) -> impl Iterator<Item = (usize, &'static FieldMapping)> {
    FIELD_MAPPINGS
        .iter()
        .enumerate()
        .filter(move |(_, m)| m.section == section)
}
