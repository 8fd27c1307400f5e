pub const GUIDE_ID: &str = "fabric-topsis-method";
pub const GUIDE_MAIN_URI: &str = "topsis://guides/fabric-topsis-method/GUIDE.md";
pub const GUIDE_WEIGHTING_URI: &str =
    "topsis://guides/fabric-topsis-method/references/weighting-modes.md";
pub const GUIDE_TIES_URI: &str =
    "topsis://guides/fabric-topsis-method/references/tie-break-policy.md";

pub const GUIDE_MAIN_TEXT: &str = include_str!("../../../guides/fabric-topsis-method/GUIDE.md");
pub const GUIDE_WEIGHTING_TEXT: &str =
    include_str!("../../../guides/fabric-topsis-method/references/weighting-modes.md");
pub const GUIDE_TIES_TEXT: &str =
    include_str!("../../../guides/fabric-topsis-method/references/tie-break-policy.md");

#[derive(Debug, Clone, Copy)]
pub struct GuideResource {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
    pub text: &'static str,
}

static GUIDE_RESOURCES: [GuideResource; 3] = [
    GuideResource {
        uri: GUIDE_MAIN_URI,
        name: "fabric-topsis-method/GUIDE.md",
        description: "Data-entry workflow and the TOPSIS computation stages.",
        mime_type: "text/markdown",
        text: GUIDE_MAIN_TEXT,
    },
    GuideResource {
        uri: GUIDE_WEIGHTING_URI,
        name: "fabric-topsis-method/references/weighting-modes.md",
        description: "Raw-weight and weight-share modes and how they differ.",
        mime_type: "text/markdown",
        text: GUIDE_WEIGHTING_TEXT,
    },
    GuideResource {
        uri: GUIDE_TIES_URI,
        name: "fabric-topsis-method/references/tie-break-policy.md",
        description: "Distinct ranks, tie order and degenerate-data handling.",
        mime_type: "text/markdown",
        text: GUIDE_TIES_TEXT,
    },
];

pub fn resources() -> &'static [GuideResource] {
    &GUIDE_RESOURCES
}

pub fn resource_text(uri: &str) -> Option<&'static str> {
    GUIDE_RESOURCES
        .iter()
        .find(|resource| resource.uri == uri)
        .map(|resource| resource.text)
}
