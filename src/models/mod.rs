pub mod packet_summary;
