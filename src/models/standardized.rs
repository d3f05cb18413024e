use crate::melt::naming::to_snake_case;

/// Reference/enumeration collections exported by the ENUMS target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardizedDataType {
    Functions,
    Industries,
    Seniorities,
    Countries,
    Regions,
}

impl StandardizedDataType {
    pub const ALL: [StandardizedDataType; 5] = [
        StandardizedDataType::Functions,
        StandardizedDataType::Industries,
        StandardizedDataType::Seniorities,
        StandardizedDataType::Countries,
        StandardizedDataType::Regions,
    ];

    /// Endpoint path, also the API's own name for the collection
    pub fn endpoint(&self) -> &'static str {
        match self {
            StandardizedDataType::Functions => "functions",
            StandardizedDataType::Industries => "industries",
            StandardizedDataType::Seniorities => "seniorities",
            StandardizedDataType::Countries => "countries",
            StandardizedDataType::Regions => "regions",
        }
    }

    pub fn normalized_name(&self) -> String {
        to_snake_case(self.endpoint())
    }
}
