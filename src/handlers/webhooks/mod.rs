pub mod rackspace;
