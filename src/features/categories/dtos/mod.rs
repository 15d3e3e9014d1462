mod category_dto;

pub use category_dto::{
    AdminListQuery, CategoryListingDto, CategoryResponseDto, CategoryRowDto, CategoryTreeDto,
    CategoryView, CreateCategoryDto, PublicListQuery, ReorderCategoriesDto, RuleLinkDto,
    RuleLinkResultDto, UpdateCategoryDto, UpdateCategoryResponseDto,
};
