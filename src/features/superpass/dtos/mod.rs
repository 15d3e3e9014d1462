mod superpass_dto;

pub use superpass_dto::{
    IssueSuperpassDto, SuperpassIssuedDto, SuperpassVerifiedDto, VerifySuperpassDto,
};
