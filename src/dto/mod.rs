pub mod signin_dto;
