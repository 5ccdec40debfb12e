pub mod packet_config;
