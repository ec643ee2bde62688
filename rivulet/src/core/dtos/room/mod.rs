pub mod create_room_dto;
